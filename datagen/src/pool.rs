use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Error;

const RESULTS_PER_WORKER: usize = 64;

/// Shared stop flag. Raised on the first fatal error or on SIGINT.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-worker job counts, merged on join.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSummary {
    pub stats: WorkerStats,
    /// Lines the writer appended to the phase output.
    pub written: usize,
}

/// One worker's view of the group: its index, the job intake and the
/// results channel.
pub struct Worker<'a, J, T> {
    pub tid: usize,
    jobs: &'a Receiver<J>,
    results: &'a Sender<T>,
    cancellation: &'a Cancellation,
}

impl<'a, J, T> Worker<'a, J, T> {
    /// Blocks for the next job. `None` once the intake is drained or the run
    /// has been cancelled.
    pub fn next_job(&self) -> Option<J> {
        if self.cancellation.is_cancelled() {
            return None;
        }
        self.jobs.recv().ok()
    }

    pub fn send(&self, result: T) -> Result<(), Error> {
        self.results.send(result).map_err(|_| Error::ResultsClosed)
    }
}

/// A fixed set of worker threads fed from one intake, with a single
/// consumer draining their results.
pub struct WorkerGroup {
    workers: usize,
    cancellation: Cancellation,
}

impl WorkerGroup {
    pub fn new(workers: usize, cancellation: Cancellation) -> Self {
        Self {
            workers: workers.max(1),
            cancellation,
        }
    }

    /// Feeds `jobs` to the workers from the calling thread and returns once
    /// every worker and the sink have been joined.
    ///
    /// The sink sees the results channel close only after the last worker has
    /// returned, so every result sent is consumed. The first fatal error
    /// cancels the group and is returned.
    pub fn run<J, T, I, W, S>(&self, jobs: I, work: W, sink: S) -> Result<PhaseSummary, Error>
    where
        J: Send,
        T: Send,
        I: IntoIterator<Item = Result<J, Error>>,
        W: Fn(&Worker<J, T>) -> Result<WorkerStats, Error> + Sync,
        S: FnOnce(Receiver<T>) -> Result<usize, Error> + Send,
    {
        let (job_tx, job_rx) = bounded::<J>(self.workers);
        let (result_tx, result_rx) = bounded::<T>(self.workers * RESULTS_PER_WORKER);
        let cancellation = &self.cancellation;

        thread::scope(|scope| {
            let writer = scope.spawn(move || {
                let written = sink(result_rx);
                if written.is_err() {
                    cancellation.cancel();
                }
                written
            });

            let handles: Vec<_> = (0..self.workers)
                .map(|tid| {
                    let jobs = job_rx.clone();
                    let results = result_tx.clone();
                    let work = &work;
                    scope.spawn(move || {
                        let worker = Worker {
                            tid,
                            jobs: &jobs,
                            results: &results,
                            cancellation,
                        };
                        let stats = work(&worker);
                        if stats.is_err() {
                            cancellation.cancel();
                        }
                        stats
                    })
                })
                .collect();

            // Workers hold the only remaining ends
            drop(job_rx);
            drop(result_tx);

            let mut intake_error = None;
            for job in jobs {
                if cancellation.is_cancelled() {
                    break;
                }
                match job {
                    Ok(job) => {
                        if job_tx.send(job).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        cancellation.cancel();
                        intake_error = Some(e);
                        break;
                    }
                }
            }
            drop(job_tx);

            let mut stats = WorkerStats::default();
            let mut worker_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(worker_stats)) => stats += worker_stats,
                    Ok(Err(e)) => {
                        worker_error.get_or_insert(e);
                    }
                    Err(_) => {
                        cancellation.cancel();
                        worker_error.get_or_insert(Error::WorkerPanicked);
                    }
                }
            }

            let written = match writer.join() {
                Ok(written) => written,
                Err(_) => {
                    cancellation.cancel();
                    Err(Error::WorkerPanicked)
                }
            };

            // A failed sink makes workers see a closed channel, so its error is the cause
            match (intake_error, written, worker_error) {
                (Some(e), _, _) => Err(e),
                (None, Err(e), _) => Err(e),
                (None, Ok(_), Some(e)) => Err(e),
                (None, Ok(written), None) => Ok(PhaseSummary { stats, written }),
            }
        })
    }
}

/// Derives a worker's random source from the phase seed.
pub fn worker_rng(seed: u64, tid: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (tid as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
