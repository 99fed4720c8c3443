mod process;

use std::io;
use std::time::Instant;

use thiserror::Error;
use uci::{GoParams, Info, Position, Score, Wdl};

pub use process::{ProcessFactory, UciProcess};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn engine {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{name}: engine I/O failed: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{name}: timed out waiting for {waiting_for}")]
    Timeout {
        name: String,
        waiting_for: &'static str,
    },

    #[error("{name}: engine exited unexpectedly")]
    Exited { name: String },

    #[error("{name}: {message}")]
    Protocol { name: String, message: String },
}

/// What an engine reported by the time it sent `bestmove`.
/// Score and WDL come from the last primary-line `info` that carried them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub best_move: Option<String>,
    pub score: Option<Score>,
    pub wdl: Option<Wdl>,
}

impl SearchOutcome {
    pub fn observe(&mut self, info: &Info) {
        if !info.is_primary() {
            return;
        }
        if info.score.is_some() {
            self.score = info.score;
        }
        if info.wdl.is_some() {
            self.wdl = info.wdl;
        }
    }
}

/// A handle to one engine. Dropping the handle closes the engine.
///
/// Every call that reads from the engine is bounded by an absolute deadline.
pub trait Engine {
    fn name(&self) -> &str;

    fn set_option(&mut self, name: &str, value: &str, deadline: Instant)
        -> Result<(), EngineError>;

    fn new_game(&mut self, deadline: Instant) -> Result<(), EngineError>;

    fn set_position(&mut self, position: &Position, deadline: Instant)
        -> Result<(), EngineError>;

    /// Starts a search; the result is collected with [`Engine::wait`].
    fn go(&mut self, params: &GoParams) -> Result<(), EngineError>;

    /// Blocks until `bestmove` or the deadline, forwarding every `info` line.
    fn wait(
        &mut self,
        deadline: Instant,
        on_info: &mut dyn FnMut(&Info),
    ) -> Result<SearchOutcome, EngineError>;
}

/// Opens engine sessions by identifier. A failure here means the
/// environment is broken, so callers treat it as fatal.
pub trait EngineFactory: Sync {
    type Engine: Engine;

    fn open(&self, name: &str) -> Result<Self::Engine, EngineError>;
}
