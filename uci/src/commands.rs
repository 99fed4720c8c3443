use std::time::Duration;

/// Commands sent from the driver to an engine process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,

    UciNewGame,
    Position(Position),
    Go(GoParams),

    Stop,
    Quit,
    SetOption {
        name: String,
        value: Option<String>,
    },
}

/// Lines an engine writes back to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    IdName(String),
    IdAuthor(String),
    UciOk,
    ReadyOk,
    /// `None` when the engine reports `(none)` or the null move.
    BestMove(Option<String>),
    Info(Info),
    Option(String),
    Unknown(String),
}

/// A starting position plus the moves played from it, in UCI notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub fen: String,
    pub moves: Vec<String>,
}

impl Position {
    pub fn from_fen(fen: impl Into<String>) -> Self {
        Self {
            fen: fen.into(),
            moves: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Info {
    pub depth: Option<u32>,
    pub sel_depth: Option<u32>,
    pub multipv: Option<u32>,
    pub nodes: Option<u64>,
    pub time: Option<u64>,
    pub score: Option<Score>,
    pub wdl: Option<Wdl>,
    pub pv: Vec<String>,
    /// Free text after `string`; it always runs to the end of the line.
    pub string: Option<String>,
}

impl Info {
    /// True when the line describes the principal variation (no multipv or multipv 1).
    pub fn is_primary(&self) -> bool {
        self.multipv.map_or(true, |n| n == 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Positive for mate-in-n, negative for mated-in-n
}

/// Win/draw/loss estimate in permille, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wdl {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl Wdl {
    /// `None` if the engine sent values too large to add up.
    pub fn total(&self) -> Option<u32> {
        self.win.checked_add(self.draw)?.checked_add(self.loss)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GoParams {
    // Search exactly movetime milliseconds.
    pub move_time: Option<u64>,
}

impl GoParams {
    pub fn movetime(duration: Duration) -> Self {
        Self {
            move_time: Some(duration.as_millis().min(u64::MAX as u128) as u64),
        }
    }
}
