mod board;
mod fen;

pub use board::{has_insufficient_material, is_game_over, is_irreversible};
pub use fen::{halfmove_clock, normalize_fen};
