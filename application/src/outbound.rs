//! Outbound queue — the single bounded FIFO every envelope leaves through.
//!
//! Multiple producers (task runners, the heartbeat, control replies) share
//! one [`OutboundQueue`]; the single consumer at any time is the current
//! session's sender, which drains the [`OutboundReceiver`]. Because the
//! receiver outlives any one session, envelopes queued while the link is
//! down flush in order after the next reconnect.
//!
//! Enqueue semantics differ per producer:
//! - task chunks block when the queue is full (backpressure), but always
//!   race against the client shutdown signal and the task's own token;
//! - heartbeats never block — a full queue drops the heartbeat;
//! - closing the queue is the last step of full shutdown and is never
//!   reopened.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokiame_domain::OutboundEnvelope;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_240;

/// Why a blocking enqueue gave up.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("client is shutting down")]
    ShuttingDown,

    #[error("task cancelled")]
    Cancelled,

    #[error("outbound queue closed")]
    Closed,
}

/// Creates the queue and its single consumer handle.
pub fn outbound_queue(
    capacity: usize,
    shutdown: CancellationToken,
) -> (OutboundQueue, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        OutboundQueue { tx, shutdown },
        OutboundReceiver { rx },
    )
}

/// Producer handle, cheap to clone.
#[derive(Clone)]
pub struct OutboundQueue {
    tx: mpsc::Sender<OutboundEnvelope>,
    shutdown: CancellationToken,
}

impl OutboundQueue {
    /// Blocking enqueue guarded by the client shutdown signal.
    pub async fn push(&self, envelope: OutboundEnvelope) -> Result<(), EnqueueError> {
        tokio::select! {
            res = self.tx.send(envelope) => res.map_err(|_| EnqueueError::Closed),
            _ = self.shutdown.cancelled() => Err(EnqueueError::ShuttingDown),
        }
    }

    /// Blocking enqueue guarded by the client shutdown signal and the
    /// producing task's own cancellation, so no runner blocks forever on a
    /// full queue once it has been cancelled.
    pub async fn push_for_task(
        &self,
        envelope: OutboundEnvelope,
        task: &CancellationToken,
    ) -> Result<(), EnqueueError> {
        tokio::select! {
            res = self.tx.send(envelope) => res.map_err(|_| EnqueueError::Closed),
            _ = task.cancelled() => Err(EnqueueError::Cancelled),
            _ = self.shutdown.cancelled() => Err(EnqueueError::ShuttingDown),
        }
    }

    /// Non-blocking enqueue for heartbeats. Returns false when the queue is
    /// full or closed; the caller decides whether that warrants a warning.
    pub fn try_push(&self, envelope: OutboundEnvelope) -> bool {
        self.tx.try_send(envelope).is_ok()
    }
}

/// Consumer handle held by the supervisor for the client's full lifetime and
/// lent to each session's sender in turn.
pub struct OutboundReceiver {
    rx: mpsc::Receiver<OutboundEnvelope>,
}

impl OutboundReceiver {
    /// Dequeues the next envelope; `None` once the queue is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<OutboundEnvelope> {
        self.rx.recv().await
    }

    /// Closes the queue. Pending envelopes stay readable; further enqueues
    /// fail. Called exactly once, at the end of client shutdown.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokiame_domain::OutboundEnvelope;

    fn chunk(task: &str, text: &str) -> OutboundEnvelope {
        OutboundEnvelope::content_chunk(task, text, None)
    }

    #[tokio::test]
    async fn envelopes_dequeue_in_fifo_order() {
        let (queue, mut rx) = outbound_queue(8, CancellationToken::new());
        queue.push(chunk("T1", "a")).await.unwrap();
        queue.push(chunk("T1", "b")).await.unwrap();

        assert_eq!(rx.recv().await, Some(chunk("T1", "a")));
        assert_eq!(rx.recv().await, Some(chunk("T1", "b")));
    }

    #[tokio::test]
    async fn push_blocks_at_capacity_until_space() {
        let (queue, mut rx) = outbound_queue(1, CancellationToken::new());
        queue.push(chunk("T1", "a")).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), queue.push(chunk("T1", "b")));
        assert!(blocked.await.is_err(), "push should block on a full queue");

        // Draining one makes room.
        assert_eq!(rx.recv().await, Some(chunk("T1", "a")));
        tokio::time::timeout(Duration::from_millis(200), queue.push(chunk("T1", "b")))
            .await
            .expect("push should succeed once space frees up")
            .unwrap();
    }

    #[tokio::test]
    async fn try_push_drops_when_full() {
        let (queue, _rx) = outbound_queue(1, CancellationToken::new());
        assert!(queue.try_push(chunk("hb", "x")));
        assert!(!queue.try_push(chunk("hb", "y")));
    }

    #[tokio::test]
    async fn shutdown_unblocks_a_full_queue_push() {
        let shutdown = CancellationToken::new();
        let (queue, _rx) = outbound_queue(1, shutdown.clone());
        queue.push(chunk("T1", "a")).await.unwrap();

        let pending = tokio::spawn({
            let queue = queue.clone();
            async move { queue.push(chunk("T1", "b")).await }
        });
        shutdown.cancel();

        assert_eq!(pending.await.unwrap(), Err(EnqueueError::ShuttingDown));
    }

    #[tokio::test]
    async fn task_cancellation_unblocks_push_for_task() {
        let (queue, _rx) = outbound_queue(1, CancellationToken::new());
        queue.push(chunk("T1", "a")).await.unwrap();

        let task = CancellationToken::new();
        let pending = tokio::spawn({
            let queue = queue.clone();
            let task = task.clone();
            async move { queue.push_for_task(chunk("T1", "b"), &task).await }
        });
        task.cancel();

        assert_eq!(pending.await.unwrap(), Err(EnqueueError::Cancelled));
    }

    #[tokio::test]
    async fn closed_queue_rejects_enqueue_but_drains() {
        let (queue, mut rx) = outbound_queue(4, CancellationToken::new());
        queue.push(chunk("T1", "a")).await.unwrap();
        rx.close();

        assert_eq!(
            queue.push(chunk("T1", "b")).await,
            Err(EnqueueError::Closed)
        );
        assert_eq!(rx.recv().await, Some(chunk("T1", "a")));
        assert_eq!(rx.recv().await, None);
    }
}
