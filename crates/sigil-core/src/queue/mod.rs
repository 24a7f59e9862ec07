//! Deferred firing: jobs, the backend port, the in-memory FIFO, and the
//! consumer that executes queued work.

mod consumer;
mod handle;
mod memory;

pub use consumer::{Consumer, ConsumerHandle, MAX_IN_FLIGHT};
pub use handle::{CANCEL_GRACE, JobHandle, JobOutcome, JobState};
pub use memory::InMemoryBackend;

use async_trait::async_trait;

use crate::domain::{CallArgs, HandlerFn};
use crate::error::SignalError;

/// One deferred handler invocation. Created at enqueue time, consumed
/// exactly once by the consumer, discarded after completion.
pub struct Job {
    pub handle: JobHandle,
    pub callable: HandlerFn,
    pub input: CallArgs,
}

/// Queue port. The in-memory FIFO is the default; the trait is the seam
/// for swapping in another transport.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Push a job onto the FIFO queue.
    async fn put(&self, job: Job) -> Result<(), SignalError>;

    /// Take the next job, suspending while the queue is empty.
    async fn poll(&self) -> Job;

    /// Number of jobs waiting to be picked up (observability).
    async fn pending(&self) -> usize;
}
