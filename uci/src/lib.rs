mod decoder;
mod encoder;

pub mod commands;

pub use commands::{EngineMessage, GoParams, Info, Position, Score, UciCommand, Wdl};
pub use decoder::Decoder;
pub use encoder::Encoder;

/// Null move in UCI format. Engines send it as the bestmove when no legal move exists.
pub const NULL_MOVE: &str = "0000";
