//! One stream session: sender and receiver workers over an open link.
//!
//! [`drive_session`] owns the lifetime of a single established stream. It
//! derives a session token (child of the client token), launches the two
//! workers, and waits until either side observes a fatal stream condition or
//! the client shuts down. Whichever worker fails first cancels the session
//! token so its sibling unblocks; running tasks are untouched — they keep
//! producing into the outbound queue and their backlog flushes after the
//! next reconnect.

use crate::dispatch::InboundDispatcher;
use crate::outbound::OutboundReceiver;
use crate::ports::coordinator::{EnvelopeSink, EnvelopeSource};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tokiame_domain::OutboundEnvelope;

/// Why a session ended, as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client is shutting down; do not reconnect.
    ClientShutdown,
    /// The stream failed (send/receive error or EOF); reconnect after
    /// backoff.
    StreamFailed,
}

/// Runs one session to completion over the given stream halves.
///
/// The registration envelope is transmitted directly on the fresh stream
/// before the queue is drained, so it is the first envelope of every session
/// even when a backlog survived a reconnect.
pub async fn drive_session(
    sink: Box<dyn EnvelopeSink>,
    source: Box<dyn EnvelopeSource>,
    client: CancellationToken,
    outbound: Arc<Mutex<OutboundReceiver>>,
    dispatcher: Arc<InboundDispatcher>,
    registration: OutboundEnvelope,
) -> SessionEnd {
    let session = client.child_token();

    let sender = tokio::spawn(run_sender(
        sink,
        session.clone(),
        outbound,
        registration,
    ));
    let receiver = tokio::spawn(run_receiver(source, session.clone(), dispatcher));

    session.cancelled().await;

    debug!("waiting for session workers to finish");
    let _ = sender.await;
    let _ = receiver.await;
    debug!("session workers finished");

    if client.is_cancelled() {
        SessionEnd::ClientShutdown
    } else {
        SessionEnd::StreamFailed
    }
}

/// Drains the outbound queue into the stream until the session ends.
async fn run_sender(
    mut sink: Box<dyn EnvelopeSink>,
    session: CancellationToken,
    outbound: Arc<Mutex<OutboundReceiver>>,
    registration: OutboundEnvelope,
) {
    debug!("sender started");

    if let Err(e) = sink.send(registration).await {
        error!("failed to send registration: {e}");
        session.cancel();
        return;
    }
    info!("registration sent");

    // Exclusive consumer for this session; released when the worker exits.
    let mut outbound = outbound.lock().await;
    loop {
        let envelope = tokio::select! {
            _ = session.cancelled() => {
                debug!("sender stopping, session ended");
                return;
            }
            dequeued = outbound.recv() => match dequeued {
                Some(envelope) => envelope,
                None => {
                    // Queue closed: the client is shutting down for good.
                    warn!("outbound queue closed, ending session");
                    session.cancel();
                    return;
                }
            },
        };

        if let Err(e) = sink.send(envelope).await {
            error!("stream send failed: {e}");
            session.cancel();
            return;
        }
    }
}

/// Pulls inbound envelopes and hands them to the dispatcher until the
/// session ends.
async fn run_receiver(
    mut source: Box<dyn EnvelopeSource>,
    session: CancellationToken,
    dispatcher: Arc<InboundDispatcher>,
) {
    debug!("receiver started");
    loop {
        if session.is_cancelled() {
            return;
        }
        let received = tokio::select! {
            biased;
            _ = session.cancelled() => {
                debug!("receiver stopping, session ended");
                return;
            }
            received = source.recv() => received,
        };

        match received {
            Ok(Some(envelope)) => dispatcher.dispatch(envelope),
            Ok(None) => {
                info!("coordinator closed the stream");
                session.cancel();
                return;
            }
            Err(e) => {
                if !session.is_cancelled() {
                    error!("stream receive failed: {e}");
                }
                session.cancel();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::outbound_queue;
    use crate::ports::catalog::ModelCatalog;
    use crate::runner::TaskRunner;
    use crate::tasks::TaskRegistry;
    use crate::test_support::{ChannelSink, ChannelSource, ScriptedBackend, StaticCatalog, model};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokiame_domain::{InboundEnvelope, OutboundEnvelope};

    struct Harness {
        sink_rx: mpsc::UnboundedReceiver<OutboundEnvelope>,
        inbound_tx: mpsc::UnboundedSender<InboundEnvelope>,
        client: CancellationToken,
        queue: crate::outbound::OutboundQueue,
        outbound: Arc<Mutex<crate::outbound::OutboundReceiver>>,
        dispatcher: Arc<InboundDispatcher>,
    }

    fn harness() -> (Harness, Box<dyn EnvelopeSink>, Box<dyn EnvelopeSource>) {
        let client = CancellationToken::new();
        let (queue, rx) = outbound_queue(64, client.clone());
        let catalog: Arc<dyn ModelCatalog> = Arc::new(StaticCatalog(vec![model("m1")]));
        let registry = Arc::new(TaskRegistry::new());
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&catalog),
            Arc::new(ScriptedBackend::new(vec![])),
            queue.clone(),
            0.75,
            0.95,
        ));
        let dispatcher = Arc::new(InboundDispatcher::new(
            registry,
            runner,
            catalog,
            queue.clone(),
            client.clone(),
        ));

        let (sink_tx, sink_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        (
            Harness {
                sink_rx,
                inbound_tx,
                client,
                queue,
                outbound: Arc::new(Mutex::new(rx)),
                dispatcher,
            },
            Box::new(ChannelSink(sink_tx)),
            Box::new(ChannelSource(inbound_rx)),
        )
    }

    #[tokio::test]
    async fn registration_precedes_a_preexisting_backlog() {
        let (mut h, sink, source) = harness();
        // A chunk queued before the session exists, as after a reconnect.
        h.queue
            .push(OutboundEnvelope::content_chunk("T1", "backlog", None))
            .await
            .unwrap();

        let session = tokio::spawn(drive_session(
            sink,
            source,
            h.client.clone(),
            Arc::clone(&h.outbound),
            Arc::clone(&h.dispatcher),
            OutboundEnvelope::registration("ns", vec![]),
        ));

        let first = h.sink_rx.recv().await.unwrap();
        assert!(matches!(first, OutboundEnvelope::Registration { .. }));
        let second = h.sink_rx.recv().await.unwrap();
        assert_eq!(
            second,
            OutboundEnvelope::content_chunk("T1", "backlog", None)
        );

        // Coordinator closes the stream; the session reports a failure.
        drop(h.inbound_tx);
        assert_eq!(session.await.unwrap(), SessionEnd::StreamFailed);
    }

    #[tokio::test]
    async fn client_shutdown_ends_the_session_without_reconnect() {
        let (h, sink, source) = harness();

        let session = tokio::spawn(drive_session(
            sink,
            source,
            h.client.clone(),
            Arc::clone(&h.outbound),
            Arc::clone(&h.dispatcher),
            OutboundEnvelope::registration("ns", vec![]),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        h.client.cancel();
        assert_eq!(session.await.unwrap(), SessionEnd::ClientShutdown);
    }

    #[tokio::test]
    async fn send_failure_fails_the_session() {
        let (mut h, sink, source) = harness();
        // Close the sink's far end so the first queue envelope send fails.
        h.sink_rx.close();

        let session = tokio::spawn(drive_session(
            sink,
            source,
            h.client.clone(),
            Arc::clone(&h.outbound),
            Arc::clone(&h.dispatcher),
            OutboundEnvelope::registration("ns", vec![]),
        ));

        assert_eq!(session.await.unwrap(), SessionEnd::StreamFailed);
    }
}
