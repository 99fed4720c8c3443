use std::str::FromStr;
use std::time::{Duration, Instant};

use chess::{Board, BoardStatus, ChessMove, Color, Game};
use rand::Rng;
use thiserror::Error;
use uci::{GoParams, Info, Position};
use utils::{halfmove_clock, has_insufficient_material, is_irreversible, normalize_fen};

use crate::book::Opening;
use crate::clock::{Clock, TimeControl};
use crate::engine::{Engine, EngineError};
use crate::sampling::reduce_samples;
use crate::settings::Settings;

const MOVE_GRACE: Duration = Duration::from_millis(1);
const MIN_MOVETIME: Duration = Duration::from_millis(1);
const FIFTY_MOVE_PLIES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    Repetition,
    FiftyMoves,
    EngineError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Option<Color>,
    pub verdict: Verdict,
}

impl Outcome {
    fn draw(verdict: Verdict) -> Self {
        Self {
            winner: None,
            verdict,
        }
    }

    /// The side on move failed; its opponent is credited with the win.
    fn engine_error(failed: Color) -> Self {
        Self {
            winner: Some(!failed),
            verdict: Verdict::EngineError,
        }
    }
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("ucinewgame failed: {0}")]
    NewGame(#[source] EngineError),

    #[error("position failed: {0}")]
    SetPosition(#[source] EngineError),

    #[error("go failed: {0}")]
    Go(#[source] EngineError),

    #[error("search failed: {0}")]
    Wait(#[source] EngineError),

    #[error("engine returned no best move")]
    NoBestMove,

    #[error("engine played illegal move {0:?}")]
    IllegalMove(String),
}

/// A game that ended with an engine error. No samples survive it.
#[derive(Debug, Error)]
#[error("{side:?} engine failed at ply {ply}: {source}")]
pub struct GameAborted {
    pub side: Color,
    pub outcome: Outcome,
    pub ply: usize,
    #[source]
    pub source: TurnError,
}

#[derive(Debug)]
pub struct PlayedGame {
    pub outcome: Outcome,
    pub plies: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub play_movetime: Duration,
    pub time_control: TimeControl,
    pub new_game_timeout: Duration,
    pub fens_in_game: usize,
}

impl From<&Settings> for GameConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            play_movetime: settings.play_movetime,
            time_control: settings.time_control,
            new_game_timeout: settings.new_game_timeout,
            fens_in_game: settings.fens_in_game,
        }
    }
}

/// Mutable state of one game in progress.
struct GameState {
    game: Game,
    start_fen: String,
    moves: Vec<String>,
    clocks: [Clock; 2],
    halfmoves: u32,
    samples: [Vec<String>; 2],
}

impl GameState {
    fn new(opening: &Opening, control: TimeControl) -> Self {
        Self {
            game: Game::new_with_board(opening.board),
            start_fen: opening.fen.clone(),
            moves: Vec::new(),
            clocks: [Clock::new(control); 2],
            halfmoves: halfmove_clock(&opening.fen).unwrap_or(0),
            samples: [Vec::new(), Vec::new()],
        }
    }

    fn ply(&self) -> usize {
        self.moves.len()
    }

    fn side_to_move(&self) -> Color {
        self.game.side_to_move()
    }

    fn position(&self) -> Position {
        Position {
            fen: self.start_fen.clone(),
            moves: self.moves.clone(),
        }
    }

    fn outcome(&self) -> Option<Outcome> {
        let board = self.game.current_position();
        match board.status() {
            BoardStatus::Checkmate => {
                return Some(Outcome {
                    winner: Some(!board.side_to_move()),
                    verdict: Verdict::Checkmate,
                })
            }
            BoardStatus::Stalemate => return Some(Outcome::draw(Verdict::Stalemate)),
            BoardStatus::Ongoing => {}
        }

        if has_insufficient_material(&board) {
            Some(Outcome::draw(Verdict::InsufficientMaterial))
        } else if self.halfmoves >= FIFTY_MOVE_PLIES {
            Some(Outcome::draw(Verdict::FiftyMoves))
        } else if self.game.can_declare_draw() {
            Some(Outcome::draw(Verdict::Repetition))
        } else {
            None
        }
    }

    fn apply(&mut self, text: &str) -> Result<(), TurnError> {
        let illegal = || TurnError::IllegalMove(text.to_string());

        let board = self.game.current_position();
        let mv = ChessMove::from_str(text).map_err(|_| illegal())?;
        if !board.legal(mv) {
            return Err(illegal());
        }

        if is_irreversible(&board, mv) {
            self.halfmoves = 0;
        } else {
            self.halfmoves += 1;
        }
        self.game.make_move(mv);
        self.moves.push(mv.to_string());

        Ok(())
    }
}

/// Plays timed games between two engine sessions and collects the
/// positions the engines report while searching.
pub struct GamePlayer {
    config: GameConfig,
}

impl GamePlayer {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }

    pub fn play<E: Engine, R: Rng>(
        &self,
        opening: &Opening,
        white: &mut E,
        black: &mut E,
        rng: &mut R,
    ) -> Result<PlayedGame, GameAborted> {
        let mut state = GameState::new(opening, self.config.time_control);
        let abort = |side: Color, ply: usize, source: TurnError| GameAborted {
            side,
            outcome: Outcome::engine_error(side),
            ply,
            source,
        };

        for (side, engine) in [(Color::White, &mut *white), (Color::Black, &mut *black)] {
            let deadline = Instant::now() + self.config.new_game_timeout;
            engine
                .new_game(deadline)
                .map_err(|e| abort(side, 0, TurnError::NewGame(e)))?;
        }

        let outcome = loop {
            if let Some(outcome) = state.outcome() {
                break outcome;
            }

            let side = state.side_to_move();
            let engine = match side {
                Color::White => &mut *white,
                Color::Black => &mut *black,
            };
            self.play_turn(&mut state, engine)
                .map_err(|e| abort(side, state.ply(), e))?;
        };

        let plies = state.ply();
        let [white_samples, black_samples] = state.samples;
        log::debug!(
            "Game over after {} plies: {:?} ({} + {} samples)",
            plies,
            outcome,
            white_samples.len(),
            black_samples.len()
        );

        Ok(PlayedGame {
            outcome,
            plies,
            samples: reduce_samples(white_samples, black_samples, self.config.fens_in_game, rng),
        })
    }

    fn play_turn<E: Engine>(&self, state: &mut GameState, engine: &mut E) -> Result<(), TurnError> {
        let side = state.side_to_move().to_index();
        let clock = state.clocks[side];

        let turn_start = Instant::now();
        let deadline = clock.deadline(turn_start) + MOVE_GRACE;

        engine
            .set_position(&state.position(), deadline)
            .map_err(TurnError::SetPosition)?;

        let movetime = self
            .config
            .play_movetime
            .min(clock.remaining())
            .max(MIN_MOVETIME);
        engine
            .go(&GoParams::movetime(movetime))
            .map_err(TurnError::Go)?;

        let samples = &mut state.samples[side];
        let result = engine
            .wait(deadline, &mut |info: &Info| {
                if let Some(fen) = info.string.as_deref().and_then(sample_position) {
                    samples.push(fen);
                }
            })
            .map_err(TurnError::Wait)?;
        let elapsed = turn_start.elapsed();

        let best_move = result.best_move.ok_or(TurnError::NoBestMove)?;
        state.apply(&best_move)?;
        state.clocks[side].record_move(elapsed);

        Ok(())
    }
}

/// Info strings are kept only when they hold a position.
fn sample_position(text: &str) -> Option<String> {
    let fen = normalize_fen(text)?;
    Board::from_str(&fen).ok()?;
    Some(fen)
}
