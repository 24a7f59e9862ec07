//! In-memory FIFO backend.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{Backend, Job};
use crate::error::SignalError;

/// Mutex + Notify FIFO: `poll` suspends while the queue is empty and wakes
/// on the next `put`. Contents are process-local and lost on restart.
pub struct InMemoryBackend {
    queue: Mutex<VecDeque<Job>>,
    notify: Notify,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn put(&self, job: Job) -> Result<(), SignalError> {
        self.queue.lock().await.push_back(job);
        self.notify.notify_one();
        Ok(())
    }

    async fn poll(&self) -> Job {
        loop {
            // notify_one stores a permit when nobody is waiting yet, so a
            // put landing between the pop attempt and the await is not lost.
            let notified = self.notify.notified();
            if let Some(job) = self.queue.lock().await.pop_front() {
                return job;
            }
            notified.await;
        }
    }

    async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallArgs, HandlerFn};
    use crate::queue::JobHandle;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn job(tag: i64) -> Job {
        Job {
            handle: JobHandle::new(),
            callable: HandlerFn::from_sync(move |_| Ok(json!(tag))),
            input: CallArgs::positional([json!(tag)]),
        }
    }

    #[tokio::test]
    async fn put_then_poll_is_fifo() {
        let backend = InMemoryBackend::new();
        backend.put(job(1)).await.unwrap();
        backend.put(job(2)).await.unwrap();

        assert_eq!(backend.poll().await.input.args, vec![json!(1)]);
        assert_eq!(backend.poll().await.input.args, vec![json!(2)]);
        assert_eq!(backend.pending().await, 0);
    }

    #[tokio::test]
    async fn poll_suspends_until_put() {
        let backend = Arc::new(InMemoryBackend::new());

        let poller = tokio::spawn({
            let backend = Arc::clone(&backend);
            async move { backend.poll().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!poller.is_finished());

        backend.put(job(7)).await.unwrap();
        let polled = tokio::time::timeout(Duration::from_secs(1), poller)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(polled.input.args, vec![json!(7)]);
    }
}
