use std::path::Path;

use crate::book::Book;
use crate::engine::EngineFactory;
use crate::error::Error;
use crate::game::{GameConfig, GamePlayer};
use crate::pool::{worker_rng, PhaseSummary, Worker, WorkerGroup, WorkerStats};
use crate::progress::PhaseProgress;
use crate::settings::Pairing;
use crate::writer::ResultWriter;

/// Plays self-play games on a worker group and writes their sampled
/// positions to one file.
pub struct Generator<'a, F> {
    factory: &'a F,
    book: &'a Book,
    pairing: &'a Pairing,
    player: GamePlayer,
}

impl<'a, F: EngineFactory> Generator<'a, F> {
    pub fn new(factory: &'a F, book: &'a Book, pairing: &'a Pairing, config: GameConfig) -> Self {
        Self {
            factory,
            book,
            pairing,
            player: GamePlayer::new(config),
        }
    }

    pub fn run(
        &self,
        group: &WorkerGroup,
        games: usize,
        seed: u64,
        output: &Path,
        progress: &PhaseProgress,
    ) -> Result<PhaseSummary, Error> {
        let writer = ResultWriter::create(output)?;

        group.run(
            (0..games).map(Ok),
            |worker| self.work(worker, seed),
            |results| writer.drain(results, progress),
        )
    }

    fn work(&self, worker: &Worker<usize, Vec<String>>, seed: u64) -> Result<WorkerStats, Error> {
        let mut rng = worker_rng(seed, worker.tid);
        let mut stats = WorkerStats::default();

        while let Some(game_id) = worker.next_job() {
            let opening = self.book.random(&mut rng);
            let (white_name, black_name) = self.pairing.pick(&mut rng);

            // Both sessions close when they go out of scope, whatever the outcome
            let mut white = self.factory.open(white_name).map_err(Error::EngineStartup)?;
            let mut black = self.factory.open(black_name).map_err(Error::EngineStartup)?;

            match self.player.play(opening, &mut white, &mut black, &mut rng) {
                Ok(game) => {
                    log::debug!(
                        "[{}] Game {} ({} vs {}): {:?} after {} plies, {} samples",
                        worker.tid,
                        game_id,
                        white_name,
                        black_name,
                        game.outcome.verdict,
                        game.plies,
                        game.samples.len()
                    );
                    stats.completed += 1;
                    worker.send(game.samples)?;
                }
                Err(aborted) => {
                    log::warn!("[{}] Game {} dropped: {}", worker.tid, game_id, aborted);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}
