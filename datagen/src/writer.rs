use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;

use crate::error::Error;
use crate::progress::PhaseProgress;

/// A result that renders as zero or more output lines.
pub trait Record: Send {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<usize>;
}

/// The sole writer of a phase's output file.
pub struct ResultWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ResultWriter {
    /// Creates (or truncates) the output file up front, so a bad path fails
    /// the phase before any engine is started.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    /// Appends every result until the channel closes and returns the line count.
    pub fn drain<T: Record>(
        mut self,
        results: Receiver<T>,
        progress: &PhaseProgress,
    ) -> Result<usize, Error> {
        let mut lines = 0;
        for result in results {
            lines += result
                .write_to(&mut self.out)
                .map_err(|e| Error::io(&self.path, e))?;
            progress.inc();
        }
        self.out.flush().map_err(|e| Error::io(&self.path, e))?;
        Ok(lines)
    }
}

/// The sampled positions of one game, one per line.
impl Record for Vec<String> {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        for fen in self {
            writeln!(out, "{}", fen)?;
        }
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_drain_writes_every_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.fen");
        let writer = ResultWriter::create(&path).unwrap();
        let progress = PhaseProgress::new("test", 3, false);

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(vec!["a".to_string(), "b".to_string()]).unwrap();
        tx.send(vec![]).unwrap();
        tx.send(vec!["c".to_string()]).unwrap();
        drop(tx);

        assert_eq!(writer.drain(rx, &progress).unwrap(), 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
        assert_eq!(progress.position(), 3);
    }

    #[test]
    fn test_create_in_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let result = ResultWriter::create(dir.path().join("missing").join("1.fen"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
