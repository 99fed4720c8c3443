use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::engine::{Engine, EngineError, EngineFactory};
use crate::error::Error;
use crate::labeler::{LabelError, LabeledRecord, Labeler};
use crate::pool::{worker_rng, PhaseSummary, Worker, WorkerGroup, WorkerStats};
use crate::progress::PhaseProgress;
use crate::writer::ResultWriter;

const SHOW_WDL_OPTION: &str = "UCI_ShowWDL";

/// Counts the non-blank lines of a position file.
pub fn count_positions(path: &Path) -> Result<usize, Error> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

fn read_positions(path: &Path) -> Result<impl Iterator<Item = Result<String, Error>> + '_, Error> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(BufReader::new(file)
        .lines()
        .filter_map(move |line| match line {
            Ok(line) => {
                let line = line.trim();
                (!line.is_empty()).then(|| Ok(line.to_string()))
            }
            Err(e) => Some(Err(Error::io(path, e))),
        }))
}

/// Drains a position file through teacher sessions, one per worker.
pub struct LabelingPool<'a, F> {
    factory: &'a F,
    teacher: &'a str,
    labeler: Labeler,
    option_timeout: Duration,
}

impl<'a, F: EngineFactory> LabelingPool<'a, F> {
    pub fn new(factory: &'a F, teacher: &'a str, labeler: Labeler, option_timeout: Duration) -> Self {
        Self {
            factory,
            teacher,
            labeler,
            option_timeout,
        }
    }

    pub fn run(
        &self,
        group: &WorkerGroup,
        input: &Path,
        seed: u64,
        output: &Path,
        progress: &PhaseProgress,
    ) -> Result<PhaseSummary, Error> {
        let positions = read_positions(input)?;
        let writer = ResultWriter::create(output)?;

        group.run(
            positions,
            |worker| self.work(worker, seed),
            |results| writer.drain(results, progress),
        )
    }

    fn open_teacher(&self) -> Result<F::Engine, Error> {
        let mut teacher = self.factory.open(self.teacher).map_err(Error::EngineStartup)?;
        teacher
            .set_option(SHOW_WDL_OPTION, "true", Instant::now() + self.option_timeout)
            .map_err(Error::EngineStartup)?;
        Ok(teacher)
    }

    fn work(&self, worker: &Worker<String, LabeledRecord>, seed: u64) -> Result<WorkerStats, Error> {
        let mut rng = worker_rng(seed, worker.tid);
        let mut stats = WorkerStats::default();
        let mut teacher = self.open_teacher()?;

        while let Some(line) = worker.next_job() {
            match self.labeler.label(&mut teacher, &line, &mut rng) {
                Ok(Some(record)) => {
                    stats.completed += 1;
                    worker.send(record)?;
                }
                Ok(None) => {
                    log::debug!("[{}] Skipping finished game {}", worker.tid, line);
                    stats.skipped += 1;
                }
                Err(e) => {
                    log::warn!("[{}] Dropped {}: {}", worker.tid, line, e);
                    stats.failed += 1;

                    if let LabelError::Engine(EngineError::Exited { .. } | EngineError::Io { .. }) = e {
                        log::warn!("[{}] Restarting {}", worker.tid, teacher.name());
                        teacher = self.open_teacher()?;
                    }
                }
            }
        }

        Ok(stats)
    }
}
