//! Heartbeat ticker.
//!
//! A client-lifetime worker: it keeps ticking across reconnects and only
//! stops on shutdown. Heartbeats never participate in task ordering and are
//! droppable, so the enqueue is non-blocking — a full queue just loses the
//! tick.

use crate::outbound::OutboundQueue;
use chrono::Utc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tokiame_domain::OutboundEnvelope;

/// Default heartbeat cadence.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(120);

/// Runs until `shutdown` fires, queueing one heartbeat per tick.
pub async fn run(queue: OutboundQueue, shutdown: CancellationToken, interval: Duration) {
    info!(?interval, "heartbeat started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the cadence starts after it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("heartbeat stopping, client is shutting down");
                return;
            }
            _ = ticker.tick() => {
                if shutdown.is_cancelled() {
                    return;
                }
                let envelope = OutboundEnvelope::heartbeat(Utc::now());
                if queue.try_push(envelope) {
                    debug!("heartbeat queued");
                } else {
                    warn!("outbound queue full, dropping heartbeat");
                }
            }
        }
    }
}
