//! Supervisor — owns the session lifecycle and reconnection.
//!
//! The outer loop runs one session at a time: dial, stream, and on failure
//! wait out the backoff before trying again. The backoff resets on every
//! successful connect, so a brief drop in steady state retries from the
//! initial interval. Shutdown (an external signal cancelling the client
//! token) ends the current session, cancels every live task, joins the
//! heartbeat, and closes the outbound queue as the final step.

use crate::config::AgentConfig;
use crate::dispatch::InboundDispatcher;
use crate::heartbeat;
use crate::outbound::{OutboundQueue, OutboundReceiver, outbound_queue};
use crate::ports::catalog::ModelCatalog;
use crate::ports::coordinator::CoordinatorLink;
use crate::ports::inference::InferenceBackend;
use crate::runner::TaskRunner;
use crate::session::{SessionEnd, drive_session};
use crate::tasks::TaskRegistry;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tokiame_domain::{OutboundEnvelope, RetryPolicy, SessionState};

pub struct Supervisor {
    config: AgentConfig,
    link: Arc<dyn CoordinatorLink>,
    catalog: Arc<dyn ModelCatalog>,
    queue: OutboundQueue,
    outbound: Arc<Mutex<OutboundReceiver>>,
    registry: Arc<TaskRegistry>,
    dispatcher: Arc<InboundDispatcher>,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(
        config: AgentConfig,
        link: Arc<dyn CoordinatorLink>,
        backend: Arc<dyn InferenceBackend>,
        catalog: Arc<dyn ModelCatalog>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let (queue, receiver) = outbound_queue(config.queue_capacity, shutdown.clone());
        let registry = Arc::new(TaskRegistry::new());
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&catalog),
            backend,
            queue.clone(),
            config.default_temperature,
            config.default_top_p,
        ));
        let dispatcher = Arc::new(InboundDispatcher::new(
            Arc::clone(&registry),
            runner,
            Arc::clone(&catalog),
            queue.clone(),
            shutdown.clone(),
        ));
        let retry = RetryPolicy::new(
            config.retry_initial,
            config.retry_max,
            config.retry_multiplier,
        );

        Self {
            config,
            link,
            catalog,
            queue,
            outbound: Arc::new(Mutex::new(receiver)),
            registry,
            dispatcher,
            retry,
            shutdown,
        }
    }

    /// Token cancelling the whole client; wire the process signal handler to
    /// this.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of currently live tasks.
    pub fn active_tasks(&self) -> usize {
        self.registry.len()
    }

    /// Runs until shutdown is requested, then performs the full teardown.
    pub async fn run(&self) {
        info!(namespace = %self.config.namespace, "agent run loop starting");
        let heartbeat = tokio::spawn(heartbeat::run(
            self.queue.clone(),
            self.shutdown.clone(),
            self.config.heartbeat_interval,
        ));

        let mut state;
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            state = SessionState::Dialing;
            debug!(%state, addr = %self.config.coordinator_addr, "attempting to establish stream");
            let (sink, source) = match self.link.connect().await {
                Ok(halves) => halves,
                Err(e) => {
                    warn!("connection attempt failed: {e}");
                    if !self.wait_for_retry().await {
                        break;
                    }
                    continue;
                }
            };
            self.retry.reset();

            state = SessionState::Streaming;
            info!(%state, "connected, stream established");
            let registration = OutboundEnvelope::registration(
                self.config.namespace.clone(),
                self.catalog.snapshot(),
            );
            let end = drive_session(
                sink,
                source,
                self.shutdown.clone(),
                Arc::clone(&self.outbound),
                Arc::clone(&self.dispatcher),
                registration,
            )
            .await;

            state = SessionState::Idle;
            match end {
                SessionEnd::ClientShutdown => break,
                SessionEnd::StreamFailed => {
                    warn!(%state, "stream session ended, will reconnect");
                    if !self.wait_for_retry().await {
                        break;
                    }
                }
            }
        }

        state = SessionState::Closing;
        info!(%state, "shutting down");
        self.registry.cancel_all();
        let _ = heartbeat.await;
        // Last step of shutdown; the queue is never reopened.
        self.outbound.lock().await.close();

        state = SessionState::Terminated;
        info!(%state, "agent run loop finished");
    }

    /// Waits out the next backoff interval. Returns false when shutdown was
    /// requested during the wait.
    async fn wait_for_retry(&self) -> bool {
        let interval = self.retry.next_interval();
        info!(?interval, "waiting before next connection attempt");
        tokio::select! {
            _ = tokio::time::sleep(interval) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }
}
