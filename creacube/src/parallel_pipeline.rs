// THEORY:
// The parallel pipeline annotates many independent sequences at once. Each sequence
// (usually one tracker export) gets its own `AnnotationPipeline` and therefore its own
// debounce state; sequences never interact, so they can run on any worker in any
// order. Within a sequence, frames are still processed strictly in order.
//
// A dispatcher hands jobs round-robin to a fixed pool of workers. Workers run each job
// on tokio's blocking pool, since decoding reads files and annotation is CPU-bound.
// Each job carries a oneshot channel for its outcome, and `annotate_all` awaits the outcomes in
// submission order, so results line up with the jobs that produced them.

use crate::core_modules::catalog::Catalog;
use crate::core_modules::frame::Frame;
use crate::error::{CreaCubeError, Result};
use crate::io::decoder::{CsvLayout, read_frames};
use crate::pipeline::{AnnotationRun, PipelineConfig, annotate};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Where a sequence's frames come from.
#[derive(Debug, Clone)]
pub enum SequenceSource {
    Frames(Vec<Frame>),
    /// A tracker export, decoded on the worker.
    CsvFile(PathBuf),
}

/// One independent sequence to annotate.
#[derive(Debug, Clone)]
pub struct SequenceJob {
    pub name: String,
    pub source: SequenceSource,
}

impl SequenceJob {
    pub fn from_frames(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: name.into(),
            source: SequenceSource::Frames(frames),
        }
    }

    pub fn from_csv(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            source: SequenceSource::CsvFile(path),
        }
    }
}

/// The result of one job. A failed job does not affect the others.
#[derive(Debug)]
pub struct SequenceOutcome {
    pub name: String,
    pub result: Result<AnnotationRun>,
}

struct SequenceTask {
    job: SequenceJob,
    result_sender: oneshot::Sender<SequenceOutcome>,
}

/// Shared, read-only inputs of every worker.
#[derive(Clone)]
struct WorkerContext {
    config: PipelineConfig,
    catalog: Arc<Catalog>,
    layout: CsvLayout,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<SequenceTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers. Must be called from within a
    /// tokio runtime.
    fn new(context: WorkerContext, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<SequenceTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<SequenceTask>())
            .unzip();

        let mut workers = Vec::with_capacity(worker_count + 1);

        // Dispatcher
        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    warn!(worker = worker_idx, "annotation worker stopped; task dropped");
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        }));

        for (worker_idx, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let worker_context = context.clone();
            workers.push(tokio::spawn(async move {
                while let Some(SequenceTask { job, result_sender }) = worker_receiver.recv().await {
                    debug!(worker = worker_idx, sequence = %job.name, "annotating sequence");
                    let job_context = worker_context.clone();
                    // File reads and annotation block; keep them off the async threads.
                    match tokio::task::spawn_blocking(move || Self::run_job(job, &job_context)).await {
                        Ok(outcome) => {
                            let _ = result_sender.send(outcome);
                        }
                        Err(err) => {
                            warn!(worker = worker_idx, error = %err, "annotation job aborted");
                        }
                    }
                }
            }));
        }

        Self {
            task_sender,
            workers,
        }
    }

    fn run_job(job: SequenceJob, context: &WorkerContext) -> SequenceOutcome {
        let frames = match job.source {
            SequenceSource::Frames(frames) => Ok(frames),
            SequenceSource::CsvFile(path) => read_frames(&path, &context.layout),
        };
        let result = frames.map(|frames| {
            annotate(context.config.clone(), Arc::clone(&context.catalog), &frames)
        });
        SequenceOutcome {
            name: job.name,
            result,
        }
    }

    async fn submit(&self, job: SequenceJob) -> Result<SequenceOutcome> {
        let (result_sender, result_receiver) = oneshot::channel();

        self.task_sender
            .send(SequenceTask { job, result_sender })
            .map_err(|_| CreaCubeError::WorkerUnavailable("failed to send task to worker pool"))?;

        result_receiver
            .await
            .map_err(|_| CreaCubeError::WorkerUnavailable("failed to receive result from worker"))
    }

    /// Number of annotation workers, not counting the dispatcher.
    pub fn worker_count(&self) -> usize {
        self.workers.len() - 1
    }
}

/// Annotates independent sequences concurrently.
pub struct ParallelPipeline {
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    /// One worker per CPU.
    pub fn new(config: PipelineConfig, catalog: Arc<Catalog>) -> Self {
        Self::with_workers(config, catalog, CsvLayout::default(), num_cpus::get())
    }

    pub fn with_workers(
        config: PipelineConfig,
        catalog: Arc<Catalog>,
        layout: CsvLayout,
        worker_count: usize,
    ) -> Self {
        let context = WorkerContext {
            config,
            catalog,
            layout,
        };
        Self {
            worker_pool: WorkerPool::new(context, worker_count),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    /// Annotates every job. Outcomes come back in the order of `jobs`.
    ///
    /// Only a lost worker fails the whole batch; a job that cannot be read reports
    /// its error in its own outcome.
    pub async fn annotate_all(&self, jobs: Vec<SequenceJob>) -> Result<Vec<SequenceOutcome>> {
        let pending = jobs.into_iter().map(|job| self.worker_pool.submit(job));
        join_all(pending).await.into_iter().collect()
    }

    /// Stops accepting work and waits for in-flight jobs to finish.
    pub async fn shutdown(self) {
        let WorkerPool {
            task_sender,
            workers,
        } = self.worker_pool;
        drop(task_sender);
        for worker in workers {
            let _ = worker.await;
        }
    }
}
