use chess::{BitBoard, Board, BoardStatus, ChessMove, Color, Piece, EMPTY};

const LIGHT_SQUARES_MASK: u64 = 0x55AA55AA55AA55AA;

/// Checks if neither side has enough material left to deliver checkmate.
/// Covers K vs K, K+minor vs K, and K+B vs K+B with same-colored bishops.
pub fn has_insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if heavy != EMPTY {
        return false;
    }

    let white = board.color_combined(Color::White);
    let black = board.color_combined(Color::Black);
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);

    let white_minors = ((white & knights) | (white & bishops)).popcnt();
    let black_minors = ((black & knights) | (black & bishops)).popcnt();

    // Lone king against at most one minor piece
    if white_minors + black_minors <= 1 {
        return true;
    }

    let white_bishops = (white & bishops).popcnt();
    let black_bishops = (black & bishops).popcnt();
    if white_minors == 1 && black_minors == 1 && white_bishops == 1 && black_bishops == 1 {
        let light_squares = BitBoard(LIGHT_SQUARES_MASK);
        let white_on_light = (white & bishops & light_squares) != EMPTY;
        let black_on_light = (black & bishops & light_squares) != EMPTY;
        return white_on_light == black_on_light;
    }

    false
}

/// True for checkmate, stalemate and dead positions.
pub fn is_game_over(board: &Board) -> bool {
    board.status() != BoardStatus::Ongoing || has_insufficient_material(board)
}

/// Pawn moves and captures reset the fifty-move counter.
pub fn is_irreversible(board: &Board, mv: ChessMove) -> bool {
    board.piece_on(mv.get_source()) == Some(Piece::Pawn) || board.piece_on(mv.get_dest()).is_some()
}
