//! Scripted in-process engines and filters for tests.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chess::{Board, ChessMove};
use uci::{GoParams, Info, Position, Score, Wdl, NULL_MOVE};

use crate::engine::{Engine, EngineError, EngineFactory, SearchOutcome};
use crate::error::Error;
use crate::filter::PositionFilter;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Knights out and back; the start position recurs a third time after 8 plies.
pub fn knight_shuffle() -> Vec<String> {
    ["g1f3", "g8f6", "f3g1", "f6g8"]
        .iter()
        .map(|mv| mv.to_string())
        .collect()
}

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub searches: AtomicUsize,
    pub options: Mutex<Vec<(String, String)>>,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// How many sessions were sent `name` set to `value`.
    pub fn option_count(&self, name: &str, value: &str) -> usize {
        self.options
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, v)| n == name && v == value)
            .count()
    }
}

/// Plays `script[ply % len]` and reports the searched position as an info string.
pub struct StubEngine {
    name: String,
    script: Vec<String>,
    score: Option<Score>,
    wdl: Option<Wdl>,
    fail_after: Option<usize>,
    position: Option<Position>,
    searches: usize,
    counters: Arc<Counters>,
}

impl StubEngine {
    pub fn new(script: Vec<String>) -> Self {
        Self {
            name: "stub".to_string(),
            script,
            score: Some(Score::Centipawns(0)),
            wdl: Some(Wdl {
                win: 0,
                draw: 1000,
                loss: 0,
            }),
            fail_after: None,
            position: None,
            searches: 0,
            counters: Arc::default(),
        }
    }

    pub fn with_eval(mut self, score: Option<Score>, wdl: Option<Wdl>) -> Self {
        self.score = score;
        self.wdl = wdl;
        self
    }

    /// Every search after the first `searches` reports the engine as exited.
    pub fn fail_after(mut self, searches: usize) -> Self {
        self.fail_after = Some(searches);
        self
    }

    pub fn searches(&self) -> usize {
        self.searches
    }

    fn current_board(&self) -> Option<Board> {
        let position = self.position.as_ref()?;
        let mut board = Board::from_str(&position.fen).ok()?;
        for mv in &position.moves {
            board = board.make_move_new(ChessMove::from_str(mv).ok()?);
        }
        Some(board)
    }

    fn exited(&self) -> EngineError {
        EngineError::Exited {
            name: self.name.clone(),
        }
    }
}

impl Engine for StubEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_option(&mut self, name: &str, value: &str, _: Instant) -> Result<(), EngineError> {
        self.counters
            .options
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn new_game(&mut self, _: Instant) -> Result<(), EngineError> {
        self.position = None;
        Ok(())
    }

    fn set_position(&mut self, position: &Position, _: Instant) -> Result<(), EngineError> {
        self.position = Some(position.clone());
        Ok(())
    }

    fn go(&mut self, _: &GoParams) -> Result<(), EngineError> {
        self.searches += 1;
        self.counters.searches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait(
        &mut self,
        _: Instant,
        on_info: &mut dyn FnMut(&Info),
    ) -> Result<SearchOutcome, EngineError> {
        if self.fail_after.is_some_and(|n| self.searches > n) {
            return Err(self.exited());
        }

        let board = self.current_board().ok_or_else(|| self.exited())?;
        let info = Info {
            depth: Some(1),
            score: self.score,
            wdl: self.wdl,
            string: Some(board.to_string()),
            ..Default::default()
        };
        on_info(&info);

        let mut outcome = SearchOutcome::default();
        outcome.observe(&info);

        let ply = self.position.as_ref().map_or(0, |p| p.moves.len());
        outcome.best_move = self
            .script
            .get(ply % self.script.len().max(1))
            .filter(|mv| mv.as_str() != NULL_MOVE)
            .cloned();

        Ok(outcome)
    }
}

impl Drop for StubEngine {
    fn drop(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opens [`StubEngine`]s sharing one set of counters.
pub struct StubFactory {
    script: Vec<String>,
    score: Option<Score>,
    wdl: Option<Wdl>,
    fail_every: Option<usize>,
    fail_after: usize,
    missing: HashSet<String>,
    pub counters: Arc<Counters>,
}

impl StubFactory {
    pub fn new(script: Vec<String>) -> Self {
        Self {
            script,
            score: Some(Score::Centipawns(0)),
            wdl: Some(Wdl {
                win: 0,
                draw: 1000,
                loss: 0,
            }),
            fail_every: None,
            fail_after: 0,
            missing: HashSet::new(),
            counters: Arc::default(),
        }
    }

    pub fn with_eval(mut self, score: Option<Score>, wdl: Option<Wdl>) -> Self {
        self.score = score;
        self.wdl = wdl;
        self
    }

    /// Every `n`th opened session (starting with the first) dies after `searches` searches.
    pub fn fail_every(mut self, n: usize, searches: usize) -> Self {
        self.fail_every = Some(n);
        self.fail_after = searches;
        self
    }

    /// Opening `name` fails the way a missing binary does.
    pub fn missing(mut self, name: &str) -> Self {
        self.missing.insert(name.to_string());
        self
    }
}

impl EngineFactory for StubFactory {
    type Engine = StubEngine;

    fn open(&self, name: &str) -> Result<StubEngine, EngineError> {
        if self.missing.contains(name) {
            return Err(EngineError::Spawn {
                name: name.to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }

        let index = self.counters.opens.fetch_add(1, Ordering::SeqCst);
        let mut engine = StubEngine::new(self.script.clone()).with_eval(self.score, self.wdl);
        engine.name = name.to_string();
        engine.counters = Arc::clone(&self.counters);
        if self.fail_every.is_some_and(|n| index % n == 0) {
            engine = engine.fail_after(self.fail_after);
        }
        Ok(engine)
    }
}

/// Passes every position through unchanged.
pub struct CopyFilter;

impl PositionFilter for CopyFilter {
    fn run(&self, input: &Path, output: &Path) -> Result<(), Error> {
        fs::copy(input, output).map_err(|e| Error::io(input, e))?;
        Ok(())
    }
}
