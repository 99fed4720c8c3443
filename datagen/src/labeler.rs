use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::{Duration, Instant};

use chess::{Board, Color};
use rand::Rng;
use thiserror::Error;
use uci::{GoParams, Info, Position, Score, Wdl};
use utils::{halfmove_clock, is_game_over, normalize_fen};

use crate::engine::{Engine, EngineError};
use crate::writer::Record;

pub const MATE_SCORE: i32 = 30000;
const FIFTY_MOVE_PLIES: u32 = 100;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("invalid position {0:?}")]
    InvalidFen(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("teacher returned no best move")]
    NoBestMove,

    #[error("teacher reported no score")]
    NoScore,

    #[error("teacher reported no WDL")]
    NoWdl,
}

/// Win/draw/loss probabilities from White's point of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WdlProbabilities {
    pub win: f64,
    pub draw: f64,
    pub loss: f64,
}

/// A teacher evaluation of one position, before the target is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub fen: String,
    pub score: i32,
    pub best_move: String,
    pub wdl: WdlProbabilities,
}

impl Evaluation {
    /// Draws the training target with `u` uniform in [0, 1).
    pub fn into_record(self, u: f64) -> LabeledRecord {
        LabeledRecord {
            target: sample_target(&self.wdl, u),
            fen: self.fen,
            score: self.score,
            best_move: self.best_move,
            wdl: self.wdl,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub fen: String,
    pub score: i32,
    pub best_move: String,
    pub wdl: WdlProbabilities,
    pub target: f64,
}

impl fmt::Display for LabeledRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.fen, self.score, self.best_move, self.wdl.win, self.wdl.draw, self.wdl.loss, self.target
        )
    }
}

impl Record for LabeledRecord {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        writeln!(out, "{}", self)?;
        Ok(1)
    }
}

/// Scores positions with a teacher engine.
pub struct Labeler {
    movetime: Duration,
    timeout: Duration,
}

impl Labeler {
    pub fn new(movetime: Duration, timeout: Duration) -> Self {
        Self { movetime, timeout }
    }

    /// `Ok(None)` for positions where the game is already over; the engine
    /// is not consulted for those.
    pub fn label<E: Engine, R: Rng>(
        &self,
        engine: &mut E,
        line: &str,
        rng: &mut R,
    ) -> Result<Option<LabeledRecord>, LabelError> {
        let evaluation = self.evaluate(engine, line)?;
        Ok(evaluation.map(|evaluation| evaluation.into_record(rng.gen::<f64>())))
    }

    pub fn evaluate<E: Engine>(
        &self,
        engine: &mut E,
        line: &str,
    ) -> Result<Option<Evaluation>, LabelError> {
        let invalid = || LabelError::InvalidFen(line.to_string());
        let fen = normalize_fen(line).ok_or_else(invalid)?;
        let board = Board::from_str(&fen).map_err(|_| invalid())?;

        if is_terminal(&board, &fen) {
            return Ok(None);
        }

        let deadline = Instant::now() + self.timeout;
        engine.set_position(&Position::from_fen(fen), deadline)?;
        engine.go(&GoParams::movetime(self.movetime))?;
        let outcome = engine.wait(deadline, &mut |_: &Info| {})?;

        let best_move = outcome.best_move.ok_or(LabelError::NoBestMove)?;
        let score = outcome.score.ok_or(LabelError::NoScore)?;
        let wdl = outcome
            .wdl
            .and_then(normalize_wdl)
            .ok_or(LabelError::NoWdl)?;

        // The record keeps the line as read, not the normalized FEN
        let side = board.side_to_move();
        Ok(Some(Evaluation {
            fen: line.trim().to_string(),
            score: white_score(score, side),
            best_move,
            wdl: white_wdl(wdl, side),
        }))
    }
}

fn is_terminal(board: &Board, fen: &str) -> bool {
    is_game_over(board) || halfmove_clock(fen).is_some_and(|n| n >= FIFTY_MOVE_PLIES)
}

/// Scales a permille triple to probabilities. `None` if it is all zeros
/// or does not fit a `u32` sum.
pub fn normalize_wdl(wdl: Wdl) -> Option<WdlProbabilities> {
    let total = wdl.total().filter(|&total| total > 0)?;
    let total = f64::from(total);
    Some(WdlProbabilities {
        win: f64::from(wdl.win) / total,
        draw: f64::from(wdl.draw) / total,
        loss: f64::from(wdl.loss) / total,
    })
}

/// Engines report from the mover's side; flip for Black.
pub fn white_wdl(wdl: WdlProbabilities, side: Color) -> WdlProbabilities {
    match side {
        Color::White => wdl,
        Color::Black => WdlProbabilities {
            win: wdl.loss,
            draw: wdl.draw,
            loss: wdl.win,
        },
    }
}

/// Centipawns from White's side, mates pinned to +/-MATE_SCORE.
pub fn white_score(score: Score, side: Color) -> i32 {
    let score = match score {
        Score::Centipawns(cp) => cp,
        Score::Mate(moves) if moves > 0 => MATE_SCORE,
        Score::Mate(_) => -MATE_SCORE,
    };
    match side {
        Color::White => score,
        Color::Black => -score,
    }
}

pub fn sample_target(wdl: &WdlProbabilities, u: f64) -> f64 {
    if u < wdl.win {
        1.0
    } else if u < wdl.win + wdl.draw {
        0.5
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubEngine, START_FEN};
    use rand::{rngs::StdRng, SeedableRng};

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    fn labeler() -> Labeler {
        Labeler::new(Duration::from_millis(10), Duration::from_secs(1))
    }

    fn teacher(score: Option<Score>, wdl: Option<Wdl>) -> StubEngine {
        StubEngine::new(vec!["e2e4".to_string()]).with_eval(score, wdl)
    }

    fn strong_white() -> Option<Wdl> {
        Some(Wdl {
            win: 900,
            draw: 100,
            loss: 0,
        })
    }

    #[test]
    fn test_white_to_move_record() {
        let mut engine = teacher(Some(Score::Centipawns(120)), strong_white());

        let record = labeler()
            .evaluate(&mut engine, START_FEN)
            .unwrap()
            .unwrap()
            .into_record(0.3);

        assert_eq!(record.score, 120);
        assert_eq!(record.target, 1.0);
        assert_eq!(record.best_move, "e2e4");
        assert_eq!(
            record.to_string(),
            format!("{},120,e2e4,0.9,0.1,0,1", START_FEN)
        );
    }

    #[test]
    fn test_record_keeps_input_line() {
        let mut engine = teacher(Some(Score::Centipawns(120)), strong_white());
        let epd = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -";

        let evaluation = labeler().evaluate(&mut engine, epd).unwrap().unwrap();
        assert_eq!(evaluation.fen, epd);
        assert_eq!(engine.searches(), 1);
    }

    #[test]
    fn test_black_to_move_is_flipped() {
        let mut engine = teacher(Some(Score::Centipawns(120)), strong_white());

        let record = labeler()
            .evaluate(&mut engine, AFTER_E4)
            .unwrap()
            .unwrap()
            .into_record(0.3);

        assert_eq!(record.score, -120);
        assert_eq!(record.wdl.win, 0.0);
        assert_eq!(record.wdl.loss, 0.9);
        assert_eq!(record.target, 0.0);
    }

    #[test]
    fn test_terminal_positions_skip_the_engine() {
        let mut engine = teacher(Some(Score::Centipawns(0)), strong_white());
        let terminal = [
            // Fool's mate
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            // Stalemate
            "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1",
            "8/8/4k3/8/8/3K4/8/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/R3K3 w - - 100 80",
        ];

        for fen in terminal {
            assert!(labeler().evaluate(&mut engine, fen).unwrap().is_none(), "{}", fen);
        }
        assert_eq!(engine.searches(), 0);
    }

    #[test]
    fn test_missing_wdl_and_score_are_errors() {
        let mut engine = teacher(Some(Score::Centipawns(5)), None);
        assert!(matches!(
            labeler().evaluate(&mut engine, START_FEN),
            Err(LabelError::NoWdl)
        ));

        let mut engine = teacher(None, strong_white());
        assert!(matches!(
            labeler().evaluate(&mut engine, START_FEN),
            Err(LabelError::NoScore)
        ));

        let zero = Some(Wdl {
            win: 0,
            draw: 0,
            loss: 0,
        });
        let mut engine = teacher(Some(Score::Centipawns(5)), zero);
        assert!(matches!(
            labeler().evaluate(&mut engine, START_FEN),
            Err(LabelError::NoWdl)
        ));
    }

    #[test]
    fn test_overflowing_wdl_is_error() {
        let overflowing = Some(Wdl {
            win: u32::MAX,
            draw: 1,
            loss: 0,
        });
        let mut engine = teacher(Some(Score::Centipawns(5)), overflowing);
        assert!(matches!(
            labeler().evaluate(&mut engine, START_FEN),
            Err(LabelError::NoWdl)
        ));
        assert!(normalize_wdl(overflowing.unwrap()).is_none());
    }

    #[test]
    fn test_invalid_fen_is_error() {
        let mut engine = teacher(Some(Score::Centipawns(5)), strong_white());
        assert!(matches!(
            labeler().evaluate(&mut engine, "not a fen at all"),
            Err(LabelError::InvalidFen(_))
        ));
        assert_eq!(engine.searches(), 0);
    }

    #[test]
    fn test_engine_exit_is_error() {
        let mut engine = teacher(Some(Score::Centipawns(5)), strong_white()).fail_after(0);
        assert!(matches!(
            labeler().evaluate(&mut engine, START_FEN),
            Err(LabelError::Engine(EngineError::Exited { .. }))
        ));
    }

    #[test]
    fn test_mate_scores_are_clamped() {
        assert_eq!(white_score(Score::Mate(3), Color::White), MATE_SCORE);
        assert_eq!(white_score(Score::Mate(-2), Color::White), -MATE_SCORE);
        assert_eq!(white_score(Score::Mate(3), Color::Black), -MATE_SCORE);
        assert_eq!(white_score(Score::Mate(0), Color::White), -MATE_SCORE);
        assert_eq!(white_score(Score::Centipawns(-40), Color::Black), 40);
    }

    #[test]
    fn test_sample_target_thresholds() {
        let wdl = WdlProbabilities {
            win: 0.25,
            draw: 0.5,
            loss: 0.25,
        };
        assert_eq!(sample_target(&wdl, 0.0), 1.0);
        assert_eq!(sample_target(&wdl, 0.3), 0.5);
        assert_eq!(sample_target(&wdl, 0.74), 0.5);
        assert_eq!(sample_target(&wdl, 0.8), 0.0);
    }

    #[test]
    fn test_labels_are_well_formed() {
        let mut engine = teacher(
            Some(Score::Centipawns(33)),
            Some(Wdl {
                win: 333,
                draw: 333,
                loss: 334,
            }),
        );
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..50 {
            let record = labeler()
                .label(&mut engine, START_FEN, &mut rng)
                .unwrap()
                .unwrap();
            assert!([0.0, 0.5, 1.0].contains(&record.target));
            let sum = record.wdl.win + record.wdl.draw + record.wdl.loss;
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }
}
