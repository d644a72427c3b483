//! Centralized configuration for Trickle streams.
//!
//! All tunable parameters of the stream variants are defined here to avoid
//! hard-coded values scattered throughout the producers.

use std::time::Duration;

use crate::chunk_policy::DEFAULT_CHUNK_SIZE;

/// Central configuration for all stream variants.
///
/// Groups per-variant settings into sections. Supports environment
/// variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct TrickleConfig {
    /// Random-content stream settings
    pub random: RandomConfig,
    /// Lag stream settings
    pub lag: LagConfig,
    /// Repeater stream settings
    pub repeater: RepeaterConfig,
    /// Seed shared by every stream built from this configuration
    pub deterministic_seed: Option<u64>,
}

/// Random-content stream configuration.
#[derive(Debug, Clone)]
pub struct RandomConfig {
    /// Chunk size used when no jitter range is given
    pub default_chunk_size: usize,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Lag stream configuration.
///
/// Controls the pull queue between the source reader and the pacer.
#[derive(Debug, Clone)]
pub struct LagConfig {
    /// Chunks the puller may queue ahead of the pacer
    pub queue_capacity: usize,
    /// Smallest read issued against the source
    pub pull_min: usize,
    /// Largest read issued against the source
    pub pull_max: usize,
    /// Delay per chunk for builders created with `LagStreamBuilder::from_config`
    pub tick_delay: Duration,
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            pull_min: 3,
            pull_max: 5,
            tick_delay: Duration::from_millis(10),
        }
    }
}

/// Header/body repeater configuration.
#[derive(Debug, Clone)]
pub struct RepeaterConfig {
    /// Smallest sub-chunk written per step
    pub chunk_min: usize,
    /// Largest sub-chunk written per step
    pub chunk_max: usize,
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        Self {
            chunk_min: 1,
            chunk_max: 3,
        }
    }
}

impl TrickleConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(seed) = std::env::var("TRICKLE_SEED") {
            if let Ok(seed_value) = seed.parse::<u64>() {
                config.deterministic_seed = Some(seed_value);
            }
        }

        if let Ok(chunk_size) = std::env::var("TRICKLE_CHUNK_SIZE") {
            if let Ok(size) = chunk_size.parse::<usize>() {
                if size > 0 {
                    config.random.default_chunk_size = size;
                }
            }
        }

        if let Ok(tick) = std::env::var("TRICKLE_LAG_TICK_MS") {
            if let Ok(millis) = tick.parse::<u64>() {
                config.lag.tick_delay = Duration::from_millis(millis);
            }
        }

        if let Ok(capacity) = std::env::var("TRICKLE_LAG_QUEUE_CAPACITY") {
            if let Ok(count) = capacity.parse::<usize>() {
                if count > 0 {
                    config.lag.queue_capacity = count;
                }
            }
        }

        config
    }

    /// Creates a configuration for reproducible tests.
    pub fn for_testing() -> Self {
        Self {
            deterministic_seed: Some(42), // Fixed seed for reproducible tests
            lag: LagConfig {
                tick_delay: Duration::from_millis(1),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = TrickleConfig::default();

        assert_eq!(config.random.default_chunk_size, 8);
        assert_eq!(config.lag.queue_capacity, 16);
        assert_eq!((config.lag.pull_min, config.lag.pull_max), (3, 5));
        assert_eq!((config.repeater.chunk_min, config.repeater.chunk_max), (1, 3));
        assert_eq!(config.deterministic_seed, None);
    }

    #[test]
    fn test_testing_preset() {
        let config = TrickleConfig::for_testing();
        assert_eq!(config.deterministic_seed, Some(42));
        assert_eq!(config.lag.tick_delay, Duration::from_millis(1));
        assert_eq!(config.lag.queue_capacity, 16);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("TRICKLE_SEED", "12345");
            std::env::set_var("TRICKLE_CHUNK_SIZE", "32");
            std::env::set_var("TRICKLE_LAG_QUEUE_CAPACITY", "not-a-number");
            std::env::set_var("TRICKLE_LAG_TICK_MS", "25");
        }

        let config = TrickleConfig::from_env();

        assert_eq!(config.deterministic_seed, Some(12345));
        assert_eq!(config.random.default_chunk_size, 32);
        assert_eq!(config.lag.queue_capacity, 16);
        assert_eq!(config.lag.tick_delay, Duration::from_millis(25));

        // Cleanup
        unsafe {
            std::env::remove_var("TRICKLE_SEED");
            std::env::remove_var("TRICKLE_CHUNK_SIZE");
            std::env::remove_var("TRICKLE_LAG_QUEUE_CAPACITY");
            std::env::remove_var("TRICKLE_LAG_TICK_MS");
        }
    }
}
