use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::book::BookError;
use crate::engine::EngineError;
use crate::settings::SettingsError;

/// Errors that abort the run. Per-job failures never surface here;
/// they are logged by the worker that hit them.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Book(#[from] BookError),

    #[error("failed to start engine: {0}")]
    EngineStartup(#[source] EngineError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run filter {binary}: {source}")]
    FilterSpawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("filter {binary} exited with {status}")]
    FilterFailed { binary: String, status: ExitStatus },

    #[error("a worker thread panicked")]
    WorkerPanicked,

    #[error("results channel closed before all results were written")]
    ResultsClosed,

    #[error("interrupted")]
    Interrupted,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
