//! Job handles: the caller-facing proxy for a queued job's eventual result
//! and cancellation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;

use crate::domain::JobId;

/// How long `cancel()` pauses after raising the flag, giving the consumer a
/// window to observe the request before the caller proceeds. A heuristic,
/// not a guarantee.
pub const CANCEL_GRACE: Duration = Duration::from_millis(100);

/// Lifecycle of a queued job.
///
/// State transitions:
/// - Pending -> Running -> Completed
/// - Pending -> Cancelled (cancelled before admission)
/// - Running -> Cancelled (cancellation won the race)
///
/// Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Enqueued, not yet picked up by the consumer.
    Pending,
    /// Admitted; the execution/cancellation race is underway.
    Running,
    /// The result slot holds a success or failure outcome.
    Completed,
    /// Cancellation was observed before completion.
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled)
    }
}

/// Terminal outcome reported through [`JobHandle::result`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(Value),
    Failed(String),
    /// The job was cancelled; any late result was discarded.
    Cancelled,
}

struct Slot {
    state: JobState,
    outcome: Option<JobOutcome>,
}

struct HandleInner {
    id: JobId,
    slot: Mutex<Slot>,
    done: Notify,
    cancel: Notify,
    cancel_requested: AtomicBool,
}

/// Cheap to clone; all clones observe the same job.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<HandleInner>,
}

impl JobHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: JobId::generate(),
                slot: Mutex::new(Slot {
                    state: JobState::Pending,
                    outcome: None,
                }),
                done: Notify::new(),
                cancel: Notify::new(),
                cancel_requested: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> JobId {
        self.inner.id
    }

    pub fn state(&self) -> JobState {
        self.inner.slot.lock().unwrap().state
    }

    /// Suspend until the job reaches a terminal state, then return its
    /// outcome.
    pub async fn result(&self) -> JobOutcome {
        loop {
            let notified = self.inner.done.notified();
            tokio::pin!(notified);
            // Register before checking so a completion racing this call is
            // never missed.
            notified.as_mut().enable();
            if let Some(outcome) = self.terminal_outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Request cancellation (best effort: the callable may still run to
    /// completion, but its result will be discarded), then pause for
    /// [`CANCEL_GRACE`] so the consumer can observe the flag.
    pub async fn cancel(&self) {
        self.inner.cancel_requested.store(true, Ordering::SeqCst);
        self.inner.cancel.notify_waiters();
        tokio::time::sleep(CANCEL_GRACE).await;
    }

    pub fn cancel_requested(&self) -> bool {
        self.inner.cancel_requested.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested. Used by the consumer
    /// as the competing side of the execution race.
    pub(crate) async fn cancelled(&self) {
        loop {
            let notified = self.inner.cancel.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.cancel_requested() {
                return;
            }
            notified.await;
        }
    }

    fn terminal_outcome(&self) -> Option<JobOutcome> {
        self.inner.slot.lock().unwrap().outcome.clone()
    }

    pub(crate) fn mark_running(&self) {
        let mut slot = self.inner.slot.lock().unwrap();
        if slot.state == JobState::Pending {
            slot.state = JobState::Running;
        }
    }

    /// Write the terminal outcome. The slot is written at most once; a late
    /// completion after cancellation is discarded.
    pub(crate) fn complete(&self, outcome: JobOutcome) {
        let mut slot = self.inner.slot.lock().unwrap();
        if slot.state.is_terminal() {
            return;
        }
        slot.state = JobState::Completed;
        slot.outcome = Some(outcome);
        drop(slot);
        self.inner.done.notify_waiters();
    }

    pub(crate) fn mark_cancelled(&self) {
        let mut slot = self.inner.slot.lock().unwrap();
        if slot.state.is_terminal() {
            return;
        }
        slot.state = JobState::Cancelled;
        slot.outcome = Some(JobOutcome::Cancelled);
        drop(slot);
        self.inner.done.notify_waiters();
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn result_waits_for_completion() {
        let handle = JobHandle::new();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.result().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.complete(JobOutcome::Succeeded(json!("done")));

        assert_eq!(waiter.await.unwrap(), JobOutcome::Succeeded(json!("done")));
        assert_eq!(handle.state(), JobState::Completed);
    }

    #[tokio::test]
    async fn outcome_is_written_at_most_once() {
        let handle = JobHandle::new();
        handle.complete(JobOutcome::Succeeded(json!(1)));
        handle.complete(JobOutcome::Failed("late".into()));
        assert_eq!(handle.result().await, JobOutcome::Succeeded(json!(1)));
    }

    #[tokio::test]
    async fn late_completion_after_cancel_is_discarded() {
        let handle = JobHandle::new();
        handle.mark_cancelled();
        handle.complete(JobOutcome::Succeeded(json!("too late")));
        assert_eq!(handle.state(), JobState::Cancelled);
        assert_eq!(handle.result().await, JobOutcome::Cancelled);
    }

    #[tokio::test]
    async fn cancel_raises_flag_and_pauses_for_grace() {
        let handle = JobHandle::new();
        assert!(!handle.cancel_requested());

        let before = std::time::Instant::now();
        handle.cancel().await;

        assert!(handle.cancel_requested());
        assert!(before.elapsed() >= CANCEL_GRACE);
    }

    #[tokio::test]
    async fn cancelled_resolves_after_request() {
        let handle = JobHandle::new();
        let watcher = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel().await;
        watcher.await.unwrap();
    }

    #[test]
    fn running_only_from_pending() {
        let handle = JobHandle::new();
        handle.mark_cancelled();
        handle.mark_running();
        assert_eq!(handle.state(), JobState::Cancelled);
    }
}
