use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::clock::{TimeControl, TimeControlError};

const DEFAULT_TIME_CONTROL: &str = "40/60+0.5";
const DEFAULT_LABEL_TIMEOUT_MS: u64 = 5000;
const DEFAULT_NEW_GAME_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} must be positive")]
    NotPositive(&'static str),

    #[error("engine names must not be empty")]
    NoEngines,

    #[error(transparent)]
    TimeControl(#[from] TimeControlError),
}

/// How the two players of a generated game are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    /// Both colors are played by their own instance of one engine.
    SelfPlay(String),
    /// Each color independently draws an engine uniformly from the pool.
    Pool(Vec<String>),
}

impl Pairing {
    pub fn pick<R: Rng>(&self, rng: &mut R) -> (&str, &str) {
        match self {
            Pairing::SelfPlay(name) => (name.as_str(), name.as_str()),
            Pairing::Pool(names) => {
                let white = names[rng.gen_range(0..names.len())].as_str();
                let black = names[rng.gen_range(0..names.len())].as_str();
                (white, black)
            }
        }
    }

    fn names(&self) -> &[String] {
        match self {
            Pairing::SelfPlay(name) => std::slice::from_ref(name),
            Pairing::Pool(names) => names,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EngineNames {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    games_in_batch: usize,
    batches: usize,
    fens_in_game: usize,
    cores: Option<usize>,
    engine_names: EngineNames,
    teacher_engine_name: String,
    filter_binary_name: String,
    play_movetime: u64,
    label_movetime: u64,
    opening_book: PathBuf,

    time_control: Option<String>,
    label_timeout: Option<u64>,
    new_game_timeout: Option<u64>,
    seed: Option<u64>,
}

/// Run configuration, validated once at load and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub games_in_batch: usize,
    pub batches: usize,
    pub fens_in_game: usize,
    pub cores: usize,
    pub pairing: Pairing,
    pub teacher_engine: String,
    pub filter_binary: String,
    pub play_movetime: Duration,
    pub label_movetime: Duration,
    pub opening_book: PathBuf,
    pub time_control: TimeControl,
    pub label_timeout: Duration,
    pub new_game_timeout: Duration,
    pub seed: Option<u64>,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&text).map_err(|e| match e {
            SettingsError::Parse { source, .. } => SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let raw: RawSettings =
            serde_json::from_str(text).map_err(|source| SettingsError::Parse {
                path: PathBuf::new(),
                source,
            })?;

        let settings = Self {
            games_in_batch: raw.games_in_batch,
            batches: raw.batches,
            fens_in_game: raw.fens_in_game,
            cores: raw.cores.unwrap_or_else(num_cpus::get),
            pairing: match raw.engine_names {
                EngineNames::One(name) => Pairing::SelfPlay(name),
                EngineNames::Many(names) => Pairing::Pool(names),
            },
            teacher_engine: raw.teacher_engine_name,
            filter_binary: raw.filter_binary_name,
            play_movetime: Duration::from_millis(raw.play_movetime),
            label_movetime: Duration::from_millis(raw.label_movetime),
            opening_book: raw.opening_book,
            time_control: raw
                .time_control
                .as_deref()
                .unwrap_or(DEFAULT_TIME_CONTROL)
                .parse()?,
            label_timeout: Duration::from_millis(
                raw.label_timeout.unwrap_or(DEFAULT_LABEL_TIMEOUT_MS),
            ),
            new_game_timeout: Duration::from_millis(
                raw.new_game_timeout.unwrap_or(DEFAULT_NEW_GAME_TIMEOUT_MS),
            ),
            seed: raw.seed,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let counts = [
            ("gamesInBatch", self.games_in_batch),
            ("batches", self.batches),
            ("fensInGame", self.fens_in_game),
            ("cores", self.cores),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(SettingsError::NotPositive(name));
            }
        }

        let durations = [
            ("playMovetime", self.play_movetime),
            ("labelMovetime", self.label_movetime),
            ("labelTimeout", self.label_timeout),
            ("newGameTimeout", self.new_game_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(SettingsError::NotPositive(name));
            }
        }

        let names = self.pairing.names();
        if names.is_empty() || names.iter().any(|name| name.trim().is_empty()) {
            return Err(SettingsError::NoEngines);
        }
        if self.teacher_engine.trim().is_empty() {
            return Err(SettingsError::NoEngines);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn config(engines: &str) -> String {
        format!(
            r#"{{
                "gamesInBatch": 100,
                "batches": 2,
                "fensInGame": 3,
                "cores": 4,
                "engineNames": {},
                "teacherEngineName": "teacher",
                "filterBinaryName": "filter",
                "playMovetime": 100,
                "labelMovetime": 200,
                "openingBook": "book.epd"
            }}"#,
            engines
        )
    }

    #[test]
    fn test_pool_settings() {
        let settings = Settings::from_json(&config(r#"["a", "b"]"#)).unwrap();
        assert_eq!(settings.games_in_batch, 100);
        assert_eq!(settings.cores, 4);
        assert_eq!(
            settings.pairing,
            Pairing::Pool(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(settings.play_movetime, Duration::from_millis(100));
        assert_eq!(settings.time_control, TimeControl::default());
        assert_eq!(settings.label_timeout, Duration::from_millis(5000));
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_single_engine_is_self_play() {
        let settings = Settings::from_json(&config(r#""solo""#)).unwrap();
        assert_eq!(settings.pairing, Pairing::SelfPlay("solo".to_string()));

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(settings.pairing.pick(&mut rng), ("solo", "solo"));
    }

    #[test]
    fn test_pool_pick_covers_pool() {
        let pairing = Pairing::Pool(vec!["a".to_string(), "b".to_string()]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let (white, black) = pairing.pick(&mut rng);
            seen.insert((white.to_string(), black.to_string()));
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_rejects_empty_pool() {
        assert!(matches!(
            Settings::from_json(&config("[]")),
            Err(SettingsError::NoEngines)
        ));
    }

    #[test]
    fn test_rejects_zero_counts() {
        let text = config(r#""solo""#).replace(r#""fensInGame": 3"#, r#""fensInGame": 0"#);
        assert!(matches!(
            Settings::from_json(&text),
            Err(SettingsError::NotPositive("fensInGame"))
        ));
    }

    #[test]
    fn test_rejects_bad_time_control() {
        for control in ["fast", "40/1e30+0"] {
            let text = config(r#""solo""#).replace(
                r#""openingBook": "book.epd""#,
                &format!(r#""openingBook": "book.epd", "timeControl": "{}""#, control),
            );
            assert!(matches!(
                Settings::from_json(&text),
                Err(SettingsError::TimeControl(_))
            ));
        }
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        assert!(matches!(
            Settings::from_json(r#"{"batches": 1}"#),
            Err(SettingsError::Parse { .. })
        ));
    }
}
