use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use thiserror::Error;

// Stands in for clocks too large to add to an `Instant`.
const UNREACHABLE_DEADLINE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time control {0:?}, expected e.g. \"40/60+0.5\" or \"60+0.5\"")]
pub struct TimeControlError(pub String);

/// A repeating time control: `moves/seconds+increment`.
///
/// Each side starts with `period`. After every move the increment is added,
/// and every `moves_per_period` moves another `period` is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeControl {
    pub moves_per_period: Option<u32>,
    pub period: Duration,
    pub increment: Duration,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self {
            moves_per_period: Some(40),
            period: Duration::from_secs(60),
            increment: Duration::from_millis(500),
        }
    }
}

impl FromStr for TimeControl {
    type Err = TimeControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeControlError(s.to_string());

        let (moves, rest) = match s.trim().split_once('/') {
            Some((moves, rest)) => (Some(moves.parse::<u32>().map_err(|_| invalid())?), rest),
            None => (None, s.trim()),
        };
        let (period, increment) = match rest.split_once('+') {
            Some((period, increment)) => (period, Some(increment)),
            None => (rest, None),
        };

        let period = parse_seconds(period).ok_or_else(invalid)?;
        let increment = match increment {
            Some(increment) => parse_seconds(increment).ok_or_else(invalid)?,
            None => Duration::ZERO,
        };

        if moves == Some(0) || period.is_zero() {
            return Err(invalid());
        }

        Ok(Self {
            moves_per_period: moves,
            period,
            increment,
        })
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(moves) = self.moves_per_period {
            write!(f, "{}/", moves)?;
        }
        write!(f, "{}", self.period.as_secs_f64())?;
        if !self.increment.is_zero() {
            write!(f, "+{}", self.increment.as_secs_f64())?;
        }
        Ok(())
    }
}

fn parse_seconds(s: &str) -> Option<Duration> {
    let seconds: f64 = s.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// One side's clock.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    control: TimeControl,
    remaining: Duration,
    moves: u32,
}

impl Clock {
    pub fn new(control: TimeControl) -> Self {
        Self {
            control,
            remaining: control.period,
            moves: 0,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// The instant this side flags if its turn started at `turn_start`.
    pub fn deadline(&self, turn_start: Instant) -> Instant {
        turn_start
            .checked_add(self.remaining)
            .unwrap_or(turn_start + UNREACHABLE_DEADLINE)
    }

    /// Charges a move that took `elapsed`. Moves accepted inside the grace
    /// window leave the clock at zero before the increment is added.
    pub fn record_move(&mut self, elapsed: Duration) {
        self.remaining = self
            .remaining
            .saturating_sub(elapsed)
            .saturating_add(self.control.increment);
        self.moves += 1;

        if let Some(per_period) = self.control.moves_per_period {
            if self.moves % per_period == 0 {
                self.remaining = self.remaining.saturating_add(self.control.period);
            }
        }
    }
}
