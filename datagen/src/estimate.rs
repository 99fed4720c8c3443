use std::time::Duration;

use crate::settings::Settings;

/// Rough plies per game, used only for the time estimate.
const PLIES_PER_GAME: f64 = 160.0;
/// Expected share of the sample cap a game actually fills, per side.
const SAMPLE_YIELD: f64 = 1.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub positions: u64,
    pub duration: Duration,
}

fn positions_per_batch(settings: &Settings) -> u64 {
    (settings.games_in_batch as f64 * settings.fens_in_game as f64 * 2.0 / SAMPLE_YIELD).round() as u64
}

fn seconds_per_batch(settings: &Settings) -> f64 {
    let cores = settings.cores as f64;
    let play = settings.games_in_batch as f64 * PLIES_PER_GAME * settings.play_movetime.as_secs_f64() / cores;
    let label = positions_per_batch(settings) as f64 * settings.label_movetime.as_secs_f64() / cores;
    play + label
}

/// Up-front size and run time of the whole run. Informational only;
/// both figures saturate instead of overflowing.
pub fn estimate(settings: &Settings) -> Estimate {
    let batches = settings.batches as u64;
    let seconds = seconds_per_batch(settings) * batches as f64;
    Estimate {
        positions: positions_per_batch(settings).saturating_mul(batches),
        duration: Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX),
    }
}
