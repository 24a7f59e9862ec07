//! Consumer: drains the backend with bounded parallelism and races each job
//! against its cancellation request.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::handle::JobOutcome;
use super::{Backend, Job};
use crate::domain::{CallArgs, HandlerFn, HandlerResult};

/// Admission limit: at most this many jobs execute at the same time.
pub const MAX_IN_FLIGHT: usize = 3;

/// Long-lived drain loop over one backend.
///
/// The loop itself never executes callables; each admitted job runs as its
/// own task so a failing or panicking job is a terminal outcome on its
/// handle, never an error inside the loop.
pub struct Consumer {
    backend: Arc<dyn Backend>,
    limiter: Arc<Semaphore>,
}

impl Consumer {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            limiter: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        }
    }

    /// Spawn the consumer loop on the current runtime.
    pub fn spawn(self) -> ConsumerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        ConsumerHandle { shutdown_tx, join }
    }

    /// Drain jobs until shutdown: dequeue in FIFO order, admit under the
    /// limiter, then race execution against cancellation.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let job = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                job = self.backend.poll() => job,
            };

            // Cancellation may have been requested while the job sat queued.
            if job.handle.cancel_requested() {
                job.handle.mark_cancelled();
                continue;
            }

            // Admission happens in the loop so start order stays FIFO. A job
            // cancelled while waiting for a permit never starts.
            let permit = tokio::select! {
                permit = Arc::clone(&self.limiter).acquire_owned() => {
                    match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
                _ = job.handle.cancelled() => {
                    job.handle.mark_cancelled();
                    continue;
                }
            };

            job.handle.mark_running();
            debug!(id = %job.handle.id(), "job admitted");
            tokio::spawn(drive(job, permit));
        }
    }
}

/// Run one job to a terminal state; the permit is held until the race ends.
async fn drive(job: Job, permit: OwnedSemaphorePermit) {
    let Job {
        handle,
        callable,
        input,
    } = job;

    let mut execution = spawn_execution(callable, input);
    tokio::select! {
        joined = &mut execution => {
            let outcome = match joined {
                Ok(Ok(value)) => JobOutcome::Succeeded(value),
                Ok(Err(err)) => JobOutcome::Failed(err.to_string()),
                Err(err) => JobOutcome::Failed(format!("job task aborted: {err}")),
            };
            if let JobOutcome::Failed(reason) = &outcome {
                warn!(id = %handle.id(), %reason, "job failed");
            }
            handle.complete(outcome);
        }
        _ = handle.cancelled() => {
            // Best effort: a callable already on the blocking pool keeps
            // running, but its result is discarded.
            execution.abort();
            handle.mark_cancelled();
            debug!(id = %handle.id(), "job cancelled");
        }
    }
    drop(permit);
}

fn spawn_execution(callable: HandlerFn, input: CallArgs) -> JoinHandle<HandlerResult> {
    match callable {
        HandlerFn::Async(handler) => tokio::spawn(async move { handler.call(input).await }),
        HandlerFn::Sync(handler) => tokio::task::spawn_blocking(move || handler.call(input)),
    }
}

/// Owner handle for a spawned consumer.
pub struct ConsumerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Stop taking new jobs. In-flight executions finish on their own.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}
