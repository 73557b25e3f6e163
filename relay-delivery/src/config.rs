use std::time::Duration;

use serde::Deserialize;

const fn default_empty_queue_sleep_secs() -> u64 {
    30
}

const fn default_throttle_secs() -> f64 {
    0.0
}

/// Limits and timings of delivery passes and the worker loop
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeliveryConfig {
    /// Cap on the number of messages selected for one pass (unbounded if unset)
    #[serde(default)]
    pub max_batch: Option<usize>,

    /// Stop a pass once this many messages were deferred in it
    #[serde(default)]
    pub max_deferred: Option<u32>,

    /// Deferrals a message may accumulate before the next transient failure
    /// fails it for good (unbounded if unset)
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Seconds to sleep between worker iterations (0 disables the sleep)
    #[serde(default = "default_empty_queue_sleep_secs")]
    pub empty_queue_sleep_secs: u64,

    /// Seconds to pause after each processed message (0 disables throttling)
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: f64,

    /// Delete Sent messages older than this many seconds after each pass.
    ///
    /// `Some(0)` deletes every Sent message, `None` keeps them forever.
    #[serde(default)]
    pub retention_secs: Option<u64>,

    /// Rows per statement when enqueueing in bulk
    #[serde(default)]
    pub messages_batch_size: Option<usize>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_batch: None,
            max_deferred: None,
            max_retries: None,
            empty_queue_sleep_secs: default_empty_queue_sleep_secs(),
            throttle_secs: default_throttle_secs(),
            retention_secs: None,
            messages_batch_size: None,
        }
    }
}

impl DeliveryConfig {
    /// The pause after each processed message, if throttling is enabled
    #[must_use]
    pub fn throttle(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.throttle_secs)
            .ok()
            .filter(|throttle| !throttle.is_zero())
    }

    #[must_use]
    pub const fn empty_queue_sleep(&self) -> Duration {
        Duration::from_secs(self.empty_queue_sleep_secs)
    }

    #[must_use]
    pub fn retention(&self) -> Option<Duration> {
        self.retention_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config: DeliveryConfig = ron::from_str("()").expect("Failed to parse");

        assert_eq!(config, DeliveryConfig::default());
        assert_eq!(config.empty_queue_sleep(), Duration::from_secs(30));
        assert_eq!(config.throttle(), None);
        assert_eq!(config.retention(), None);
    }

    #[test]
    fn test_parse() {
        let config: DeliveryConfig = ron::from_str(
            "(
                max_batch: Some(100),
                max_retries: Some(3),
                throttle_secs: 0.5,
                retention_secs: Some(0),
            )",
        )
        .expect("Failed to parse");

        assert_eq!(config.max_batch, Some(100));
        assert_eq!(config.max_retries, Some(3));
        assert_eq!(config.max_deferred, None);
        assert_eq!(config.throttle(), Some(Duration::from_millis(500)));
        assert_eq!(config.retention(), Some(Duration::ZERO));
    }

    #[test]
    fn test_negative_throttle_is_disabled() {
        let config = DeliveryConfig {
            throttle_secs: -1.0,
            ..DeliveryConfig::default()
        };

        assert_eq!(config.throttle(), None);
    }
}
