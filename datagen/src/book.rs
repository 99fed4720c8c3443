use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chess::Board;
use rand::Rng;
use thiserror::Error;
use utils::normalize_fen;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("failed to read opening book {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("opening book {path}, line {line}: invalid position {text:?}")]
    InvalidPosition {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("opening book {0} is empty")]
    Empty(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Opening {
    pub fen: String,
    pub board: Board,
}

impl Opening {
    pub fn parse(text: &str) -> Option<Self> {
        let fen = normalize_fen(text)?;
        let board = Board::from_str(&fen).ok()?;
        Some(Self { fen, board })
    }
}

pub struct Book {
    openings: Vec<Opening>,
}

impl Book {
    /// Loads one position per line. Blank lines and `#` comments are skipped,
    /// anything else must parse or the whole book is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BookError> {
        let path = path.as_ref();
        let read_error = |source| BookError::Read {
            path: path.to_path_buf(),
            source,
        };

        let reader = BufReader::new(File::open(path).map_err(read_error)?);

        let mut openings = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(read_error)?;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let opening = Opening::parse(text).ok_or_else(|| BookError::InvalidPosition {
                path: path.to_path_buf(),
                line: idx + 1,
                text: text.to_string(),
            })?;
            openings.push(opening);
        }

        if openings.is_empty() {
            return Err(BookError::Empty(path.to_path_buf()));
        }

        log::info!("Loaded {} positions from opening book", openings.len());

        Ok(Self { openings })
    }

    pub fn from_openings(openings: Vec<Opening>) -> Self {
        Self { openings }
    }

    pub fn random<R: Rng>(&self, rng: &mut R) -> &Opening {
        &self.openings[rng.gen_range(0..self.openings.len())]
    }

    pub fn len(&self) -> usize {
        self.openings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }
}
