//! Reconnect backoff policy.

use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

/// Exponential backoff with jitter for coordinator reconnection.
///
/// Each call to [`next_interval`](Self::next_interval) returns the current
/// interval with ±10% jitter applied, then advances the stored interval by
/// the multiplier (capped at `max`). [`reset`](Self::reset) returns to the
/// initial interval and is called by the supervisor after a successful
/// connect, so a brief drop in steady state retries from the start.
///
/// The mutable interval sits behind a `Mutex` so a reset racing a concurrent
/// read still observes a consistent value.
#[derive(Debug)]
pub struct RetryPolicy {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Mutex<Duration>,
}

impl RetryPolicy {
    /// Multipliers below 1.0 are clamped to 1.0 so the interval never shrinks.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max,
            multiplier: multiplier.max(1.0),
            current: Mutex::new(initial),
        }
    }

    /// Returns the interval to wait before the next attempt and advances the
    /// stored interval.
    pub fn next_interval(&self) -> Duration {
        let interval = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            let interval = *current;
            *current = Duration::from_secs_f64(
                (current.as_secs_f64() * self.multiplier).min(self.max.as_secs_f64()),
            );
            interval
        };

        // A zeroed interval means the policy was never meaningfully advanced.
        let interval = if interval.is_zero() {
            self.initial
        } else {
            interval
        };

        let jitter_range = interval.as_secs_f64() * 0.1;
        let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        Duration::from_secs_f64((interval.as_secs_f64() + jitter).max(0.0))
    }

    /// Returns to the initial interval.
    pub fn reset(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 2.0)
    }

    fn assert_within_jitter(actual: Duration, base: Duration) {
        let lo = base.as_secs_f64() * 0.9;
        let hi = base.as_secs_f64() * 1.1;
        let got = actual.as_secs_f64();
        assert!(
            got >= lo && got <= hi,
            "expected {got} within [{lo}, {hi}]"
        );
    }

    #[test]
    fn first_interval_is_initial_with_jitter() {
        assert_within_jitter(policy().next_interval(), Duration::from_secs(1));
    }

    #[test]
    fn intervals_double_up_to_max() {
        let p = policy();
        assert_within_jitter(p.next_interval(), Duration::from_secs(1));
        assert_within_jitter(p.next_interval(), Duration::from_secs(2));
        assert_within_jitter(p.next_interval(), Duration::from_secs(4));
        // Burn through the remaining doublings; the cap holds after that.
        for _ in 0..10 {
            p.next_interval();
        }
        assert_within_jitter(p.next_interval(), Duration::from_secs(30));
    }

    #[test]
    fn reset_returns_to_initial() {
        let p = policy();
        p.next_interval();
        p.next_interval();
        p.reset();
        assert_within_jitter(p.next_interval(), Duration::from_secs(1));
    }

    #[test]
    fn sub_one_multiplier_is_clamped() {
        let p = RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(30), 0.5);
        assert_within_jitter(p.next_interval(), Duration::from_secs(2));
        assert_within_jitter(p.next_interval(), Duration::from_secs(2));
    }
}
