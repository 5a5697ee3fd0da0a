//! Agent configuration.

use crate::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;
use crate::outbound::DEFAULT_QUEUE_CAPACITY;
use std::time::Duration;

/// Tunables for one agent instance. [`AgentConfig::new`] applies the
/// defaults; `with_*` builders override individual values.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Namespace this agent registers under.
    pub namespace: String,
    /// Coordinator address; a `grpcs://` prefix selects TLS.
    pub coordinator_addr: String,
    /// Capacity of the outbound envelope queue.
    pub queue_capacity: usize,
    /// Heartbeat cadence.
    pub heartbeat_interval: Duration,
    /// Reconnect backoff: first interval.
    pub retry_initial: Duration,
    /// Reconnect backoff: cap.
    pub retry_max: Duration,
    /// Reconnect backoff: growth factor.
    pub retry_multiplier: f64,
    /// Sampling temperature when the instruction does not carry one.
    pub default_temperature: f32,
    /// Nucleus sampling value when the instruction does not carry one.
    pub default_top_p: f32,
}

impl AgentConfig {
    pub fn new(namespace: impl Into<String>, coordinator_addr: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            coordinator_addr: coordinator_addr.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            retry_initial: Duration::from_secs(1),
            retry_max: Duration::from_secs(30),
            retry_multiplier: 2.0,
            default_temperature: 0.75,
            default_top_p: 0.95,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_retry(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.retry_initial = initial;
        self.retry_max = max;
        self.retry_multiplier = multiplier;
        self
    }

    pub fn with_sampling_defaults(mut self, temperature: f32, top_p: f32) -> Self {
        self.default_temperature = temperature;
        self.default_top_p = top_p;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_protocol_constants() {
        let config = AgentConfig::new("ns", "grpc://localhost:50051");
        assert_eq!(config.queue_capacity, 10_240);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(120));
        assert_eq!(config.retry_initial, Duration::from_secs(1));
        assert_eq!(config.retry_max, Duration::from_secs(30));
        assert_eq!(config.retry_multiplier, 2.0);
    }
}
