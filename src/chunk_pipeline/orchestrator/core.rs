// In: src/chunk_pipeline/orchestrator/core.rs

use std::any::Any;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::chunk_pipeline::channel::{BoundedChannel, CompleteOnDrop};
use crate::chunk_pipeline::chunk::{BufferPool, Chunk};
use crate::chunk_pipeline::codec::codec_for;
use crate::chunk_pipeline::orchestrator::stages::{self, SplitStats, WriteStats};
use crate::chunk_pipeline::traits::Codec;
use crate::config::{Direction, PipelineConfig};
use crate::error::{PzipError, Result};

// --- ARCHITECTURAL NOTE ---
//
// A run is one splitter thread, `W` worker threads and one writer thread,
// joined by two channels:
//
//   input -> [splitter] -> A -> [worker x W] -> B -> [writer] -> output
//
// Normal shutdown is strictly ordered. A is completed when the splitter
// returns. B is completed by the orchestrator only after EVERY worker has been
// joined; completing it when the first worker exits would let the writer
// finish before slower workers deliver their chunks.
//
// On failure the supervisor records the first error and completes both
// channels. Healthy stages see the refusal at their next put/take and exit on
// their own, so every scoped thread can be joined and the run reports exactly
// one outcome.
//
// --- END ARCHITECTURAL NOTE ---

//==================================================================================
// 1. Public Types
//==================================================================================

/// Lifecycle of a `Pipeline`. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub direction: Direction,
    pub workers: usize,
    pub chunks_read: u64,
    pub chunks_written: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// One compress or decompress run over a single input and a single output.
pub struct Pipeline {
    codec: Box<dyn Codec>,
    config: PipelineConfig,
    state: PipelineState,
}

//==================================================================================
// 2. Failure Supervision
//==================================================================================

/// Captures the first stage failure and closes both channels so every stage
/// unblocks.
struct Supervisor<'a> {
    first_error: Mutex<Option<PzipError>>,
    to_workers: &'a BoundedChannel<Chunk>,
    to_writer: &'a BoundedChannel<Chunk>,
}

impl<'a> Supervisor<'a> {
    fn new(to_workers: &'a BoundedChannel<Chunk>, to_writer: &'a BoundedChannel<Chunk>) -> Self {
        Self {
            first_error: Mutex::new(None),
            to_workers,
            to_writer,
        }
    }

    fn fail(&self, stage: &str, error: PzipError) {
        {
            let mut slot = self.first_error.lock();
            if slot.is_none() {
                log::error!("{} failed: {}", stage, error);
                *slot = Some(error);
            } else {
                log::debug!("{} failed after the run already failed: {}", stage, error);
            }
        }
        self.to_workers.complete();
        self.to_writer.complete();
    }

    /// Runs a stage body, turning both errors and panics into a recorded failure.
    fn guard<T: Default>(&self, stage: &str, body: impl FnOnce() -> Result<T>) -> T {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => value,
            Ok(Err(error)) => {
                self.fail(stage, error);
                T::default()
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.fail(stage, PzipError::Internal(format!("{} panicked: {}", stage, message)));
                T::default()
            }
        }
    }

    fn into_error(self) -> Option<PzipError> {
        self.first_error.into_inner()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

//==================================================================================
// 3. Public Orchestration API
//==================================================================================

impl Pipeline {
    /// Validates `config` and selects the codec for `direction`.
    /// Fails with `Configuration` before any thread exists.
    pub fn new(direction: Direction, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let codec = codec_for(direction, &config);
        Ok(Self::assemble(codec, config))
    }

    /// Builds a pipeline around a caller-supplied codec.
    pub fn with_codec(codec: Box<dyn Codec>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(codec, config))
    }

    fn assemble(codec: Box<dyn Codec>, config: PipelineConfig) -> Self {
        Self {
            codec,
            config,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.codec.direction()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline to a terminal state, blocking the caller.
    ///
    /// On failure the returned error is always `OperationFailed`, carrying the
    /// first stage error as its source. A pipeline runs at most once.
    pub fn run<R, W>(&mut self, input: R, output: W) -> Result<PipelineReport>
    where
        R: Read + Send,
        W: Write + Send,
    {
        let verb = self.direction().verb();
        if self.state != PipelineState::Idle {
            return Err(PzipError::Internal(format!(
                "pipeline already ran (state {:?})",
                self.state
            )));
        }

        self.state = PipelineState::Running;
        match self.execute(input, output) {
            Ok(report) => {
                self.state = PipelineState::Completed;
                log::info!(
                    "{}: {} chunks, {} -> {} bytes in {:.2?}",
                    verb,
                    report.chunks_written,
                    report.bytes_read,
                    report.bytes_written,
                    report.elapsed
                );
                Ok(report)
            }
            Err(cause) => {
                self.state = PipelineState::Failed;
                Err(PzipError::operation_failed(verb, cause))
            }
        }
    }

    fn execute<R, W>(&self, input: R, output: W) -> Result<PipelineReport>
    where
        R: Read + Send,
        W: Write + Send,
    {
        let started = Instant::now();
        let workers = self.config.resolved_worker_count();
        let to_workers = BoundedChannel::new(self.config.input_capacity)?;
        let to_writer = BoundedChannel::new(self.config.output_capacity)?;
        let pool = BufferPool::new(self.config.chunk_size, pool_size(&self.config, workers));
        let supervisor = Supervisor::new(&to_workers, &to_writer);
        let codec: &dyn Codec = self.codec.as_ref();

        log::info!(
            "{}: starting with {} workers, chunk size {}, channels {:?}/{:?}",
            self.direction().verb(),
            workers,
            self.config.chunk_size,
            self.config.input_capacity,
            self.config.output_capacity
        );

        let (split, written) = thread::scope(|scope| -> (SplitStats, WriteStats) {
            let splitter = spawn_stage(scope, &supervisor, "pzip-splitter".to_string(), || {
                let _complete_a = CompleteOnDrop(&to_workers);
                supervisor.guard("splitter", || {
                    stages::split_input(input, codec, &pool, &to_workers)
                })
            });

            let mut worker_handles = Vec::with_capacity(workers);
            for worker_id in 0..workers {
                let handle = spawn_stage(scope, &supervisor, format!("pzip-worker-{}", worker_id), {
                    let (supervisor, pool, to_workers, to_writer) =
                        (&supervisor, &pool, &to_workers, &to_writer);
                    move || {
                        supervisor.guard("worker", || {
                            stages::transform_chunks(worker_id, codec, pool, to_workers, to_writer)
                        })
                    }
                });
                worker_handles.push(handle);
            }

            let writer = spawn_stage(scope, &supervisor, "pzip-writer".to_string(), || {
                supervisor.guard("writer", || {
                    stages::write_ordered(output, codec, &to_writer)
                })
            });

            let split = join_stage(splitter, &supervisor, "splitter");
            for handle in worker_handles {
                join_stage(handle, &supervisor, "worker");
            }
            // Every worker is gone: nothing else can reach channel B.
            to_writer.complete();
            let written = join_stage(writer, &supervisor, "writer");

            (split, written)
        });

        if let Some(error) = supervisor.into_error() {
            return Err(error);
        }

        Ok(PipelineReport {
            direction: self.direction(),
            workers,
            chunks_read: split.chunks,
            chunks_written: written.chunks,
            bytes_read: split.bytes,
            bytes_written: written.bytes,
            elapsed: started.elapsed(),
        })
    }
}

/// Most idle buffers a pool keeps, however large the channel bounds are.
const MAX_POOLED_BUFFERS: usize = 4096;

/// Idle buffers worth keeping: everything that can be in flight at once.
fn pool_size(config: &PipelineConfig, workers: usize) -> usize {
    let per_worker = workers.saturating_mul(2);
    let bound = |c: Option<usize>| c.unwrap_or(per_worker);
    bound(config.input_capacity.limit())
        .saturating_add(bound(config.output_capacity.limit()))
        .saturating_add(per_worker)
        .saturating_add(2)
        .min(MAX_POOLED_BUFFERS)
}

/// Spawns a named stage thread. A spawn failure is recorded at once so that
/// stages already running are released instead of waiting on a missing peer.
fn spawn_stage<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    supervisor: &Supervisor<'_>,
    name: String,
    body: F,
) -> Option<ScopedJoinHandle<'scope, T>>
where
    T: Send + 'scope,
    F: FnOnce() -> T + Send + 'scope,
{
    match thread::Builder::new().name(name.clone()).spawn_scoped(scope, body) {
        Ok(handle) => Some(handle),
        Err(e) => {
            supervisor.fail(&name, PzipError::Io(e));
            None
        }
    }
}

fn join_stage<T: Default>(
    handle: Option<ScopedJoinHandle<'_, T>>,
    supervisor: &Supervisor<'_>,
    stage: &str,
) -> T {
    match handle {
        Some(handle) => match handle.join() {
            Ok(value) => value,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                supervisor.fail(stage, PzipError::Internal(format!("{} panicked: {}", stage, message)));
                T::default()
            }
        },
        None => T::default(),
    }
}
