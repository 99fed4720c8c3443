use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::book::Book;
use crate::engine::EngineFactory;
use crate::error::Error;
use crate::filter::PositionFilter;
use crate::game::GameConfig;
use crate::generator::Generator;
use crate::labeler::Labeler;
use crate::labeling::{count_positions, LabelingPool};
use crate::pool::{Cancellation, WorkerGroup, WorkerStats};
use crate::progress::PhaseProgress;
use crate::settings::Settings;

/// The three files a batch moves through. Only the dataset is kept.
#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub raw: PathBuf,
    pub filtered: PathBuf,
    pub dataset: PathBuf,
}

impl BatchPaths {
    pub fn new(dir: &Path, batch: usize) -> Self {
        Self {
            raw: dir.join(format!("{}.fen", batch)),
            filtered: dir.join(format!("{}.txt", batch)),
            dataset: dir.join(format!("{}.raw", batch)),
        }
    }

    /// Removes whichever of the `.fen` and `.txt` files still exist.
    fn remove_intermediates(&self) {
        for path in [&self.raw, &self.filtered] {
            if path.exists() {
                remove_artifact(path);
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub games: WorkerStats,
    pub positions: usize,
    pub labels: WorkerStats,
    pub records: usize,
}

/// Runs every batch: generate, filter, label.
pub struct Pipeline<'a, F, P> {
    settings: &'a Settings,
    book: &'a Book,
    factory: &'a F,
    filter: &'a P,
    output_dir: PathBuf,
    cancellation: Cancellation,
    show_progress: bool,
}

impl<'a, F: EngineFactory, P: PositionFilter> Pipeline<'a, F, P> {
    pub fn new(
        settings: &'a Settings,
        book: &'a Book,
        factory: &'a F,
        filter: &'a P,
        output_dir: impl Into<PathBuf>,
        cancellation: Cancellation,
    ) -> Self {
        Self {
            settings,
            book,
            factory,
            filter,
            output_dir: output_dir.into(),
            cancellation,
            show_progress: true,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<RunSummary, Error> {
        let group = WorkerGroup::new(self.settings.cores, self.cancellation.clone());
        let mut summary = RunSummary::default();

        for batch in 0..self.settings.batches {
            let paths = BatchPaths::new(&self.output_dir, batch);
            if let Err(e) = self.run_batch(batch, &paths, &group, rng, &mut summary) {
                paths.remove_intermediates();
                return Err(e);
            }
            summary.batches += 1;
        }

        Ok(summary)
    }

    fn run_batch<R: Rng>(
        &self,
        batch: usize,
        paths: &BatchPaths,
        group: &WorkerGroup,
        rng: &mut R,
        summary: &mut RunSummary,
    ) -> Result<(), Error> {
        let games = self.settings.games_in_batch;

        log::info!("Batch #{}, generating positions", batch);
        let progress = PhaseProgress::new(format!("#{} games", batch), games, self.show_progress);
        let generator = Generator::new(
            self.factory,
            self.book,
            &self.settings.pairing,
            GameConfig::from(self.settings),
        );
        let generated = generator.run(group, games, rng.gen(), &paths.raw, &progress)?;
        progress.finish();
        self.check_interrupted()?;
        log::info!(
            "Batch #{}: {} games played, {} dropped, {} positions written to {}",
            batch,
            generated.stats.completed,
            generated.stats.failed,
            generated.written,
            paths.raw.display()
        );

        log::info!("Batch #{}, filtering positions", batch);
        self.filter.run(&paths.raw, &paths.filtered)?;
        remove_artifact(&paths.raw);

        let positions = count_positions(&paths.filtered)?;
        log::info!("Batch #{}, labeling {} positions", batch, positions);
        let progress = PhaseProgress::new(format!("#{} labels", batch), positions, self.show_progress);
        let pool = LabelingPool::new(
            self.factory,
            &self.settings.teacher_engine,
            Labeler::new(self.settings.label_movetime, self.settings.label_timeout),
            self.settings.new_game_timeout,
        );
        let labeled = pool.run(group, &paths.filtered, rng.gen(), &paths.dataset, &progress)?;
        progress.finish();
        self.check_interrupted()?;
        log::info!(
            "Batch #{}: {} labeled, {} skipped, {} dropped, written to {}",
            batch,
            labeled.stats.completed,
            labeled.stats.skipped,
            labeled.stats.failed,
            paths.dataset.display()
        );
        remove_artifact(&paths.filtered);

        summary.games += generated.stats;
        summary.positions += generated.written;
        summary.labels += labeled.stats;
        summary.records += labeled.written;

        Ok(())
    }

    fn check_interrupted(&self) -> Result<(), Error> {
        if self.cancellation.is_cancelled() {
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}

fn remove_artifact(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Failed to remove {}: {}", path.display(), e);
    }
}
