//! Exponential backoff for reconnection attempts.
//!
//! Delays grow exponentially from an initial value up to a cap, with
//! optional jitter to prevent thundering-herd reconnects when many clients
//! lose the same endpoint.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff schedule.
///
/// # Examples
///
/// ```
/// use kodi_control::supervisor::ExponentialBackoff;
/// use std::time::Duration;
///
/// // Default configuration
/// let backoff = ExponentialBackoff::default();
///
/// // Custom configuration
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(250))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(false)
///     .build();
///
/// assert_eq!(backoff.delay(0), Duration::from_millis(250));
/// assert_eq!(backoff.delay(1), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay before the first retry.
    initial_delay: Duration,
    /// Cap on the delay between retries.
    max_delay: Duration,
    /// Multiplier for exponential growth.
    multiplier: f64,
    /// Whether to randomize delays.
    jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ExponentialBackoff {
    /// Create a new builder for configuring the schedule.
    #[must_use]
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Creates a schedule spanning `min` to `max` with the default growth
    /// factor and jitter.
    #[must_use]
    pub fn between(min: Duration, max: Duration) -> Self {
        Self {
            initial_delay: min,
            max_delay: max,
            ..Self::default()
        }
    }

    /// Calculate the delay before attempt number `attempt` (0-indexed).
    ///
    /// With jitter enabled the result is drawn uniformly from zero up to
    /// the capped exponential value, so it is not monotonic in `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = Duration::from_millis(base_ms as u64).min(self.max_delay);

        if self.jitter {
            let jitter_ms = rand::thread_rng().gen_range(0.0..=capped.as_millis() as f64);
            Duration::from_millis(jitter_ms as u64)
        } else {
            capped
        }
    }
}

/// Builder for [`ExponentialBackoff`].
#[derive(Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        let defaults = ExponentialBackoff::default();
        Self {
            initial_delay: defaults.initial_delay,
            max_delay: defaults.max_delay,
            multiplier: defaults.multiplier,
            jitter: defaults.jitter,
        }
    }
}

impl ExponentialBackoffBuilder {
    /// Set the delay before the first retry.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the cap on the delay between retries.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the multiplier for exponential growth.
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Build the schedule.
    #[must_use]
    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .jitter(false)
            .max_delay(Duration::from_secs(10))
            .build();

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .jitter(false)
            .max_delay(Duration::from_millis(500))
            .build();

        assert_eq!(backoff.delay(10), Duration::from_millis(500));
        assert_eq!(backoff.delay(30), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_within_cap() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(400))
            .jitter(true)
            .build();

        for attempt in 0..20 {
            assert!(backoff.delay(attempt) <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_between_uses_bounds() {
        let backoff = ExponentialBackoff::between(
            Duration::from_millis(50),
            Duration::from_secs(5),
        );
        assert!(backoff.delay(0) <= Duration::from_millis(50));
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let backoff = ExponentialBackoff::builder().jitter(false).build();
        // f64 saturates to infinity; the cast saturates to u64::MAX and
        // the cap still applies.
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(30));
    }
}
