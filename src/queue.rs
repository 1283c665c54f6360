//! A typed task queue abstraction standing in for the original's Celery
//! broker (`CELERY_BROKER_URL`).
//!
//! Grounded on spec §9's "Background tasks" design note: tasks become
//! typed payloads rather than decorated functions, and delay/retry
//! semantics live in the queue protocol (the envelope carrying a task),
//! never inside the task body itself. The single implementation here is
//! in-process (`tokio::sync::mpsc` plus a per-item delay via
//! `tokio::time::sleep`), matching `standalone` mode's single-instance
//! assumption; a durable, cross-instance broker is an external
//! configuration concern (`CELERY_BROKER_URL` in §6) this crate does not
//! implement itself.

use std::time::Duration;
use tokio::sync::mpsc;

/// A unit of deferred work: requery a transaction after an initial delay,
/// retried a bounded number of times.
#[derive(Debug, Clone)]
pub struct RequeryTask {
    pub transaction_id: i64,
    pub attempt: u32,
}

/// An envelope carrying a task plus how long to wait before running it.
#[derive(Debug, Clone)]
pub struct Scheduled<T> {
    pub task: T,
    pub delay: Duration,
}

/// Where the requery worker pulls its work from. A trait so the
/// coordinator and the worker pool can be wired against an in-process
/// queue in tests and a broker-backed one in `standalone`-off deployments
/// without either side depending on the transport.
#[async_trait::async_trait]
pub trait TaskQueue<T: Send + 'static>: Send + Sync {
    /// Enqueue `task`, to become visible to a consumer after `delay`.
    async fn schedule(&self, task: T, delay: Duration);
}

/// An in-process task queue: `schedule` spawns a delay timer and then
/// forwards the task over an `mpsc` channel. Worker pool size is the
/// channel's number of concurrent consumers, configured by the caller
/// that drains the receiver.
pub struct InProcessQueue<T> {
    sender: mpsc::Sender<T>,
}

impl<T: Send + 'static> InProcessQueue<T> {
    /// Build a queue with the given channel capacity, returning the queue
    /// handle and the receiver a worker pool drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> TaskQueue<T> for InProcessQueue<T> {
    async fn schedule(&self, task: T, delay: Duration) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if sender.send(task).await.is_err() {
                tracing::warn!("task queue receiver dropped before a scheduled task could be delivered");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_a_task_after_its_delay() {
        let (queue, mut rx) = InProcessQueue::new(8);
        queue
            .schedule(RequeryTask { transaction_id: 42, attempt: 0 }, Duration::from_millis(1))
            .await;

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("task should arrive within the timeout")
            .expect("channel should not be closed");
        assert_eq!(received.transaction_id, 42);
    }

    #[tokio::test]
    async fn zero_delay_tasks_still_deliver() {
        let (queue, mut rx) = InProcessQueue::new(8);
        queue.schedule(RequeryTask { transaction_id: 7, attempt: 1 }, Duration::ZERO).await;

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.transaction_id, 7);
        assert_eq!(received.attempt, 1);
    }
}
