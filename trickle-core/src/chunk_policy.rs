//! Chunk sizing policy for producers.

use crate::errors::{Result, StreamError};
use crate::rng::DeterministicRng;

/// Chunk size used when no policy is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 8;

/// How many bytes a producer emits per production step.
///
/// Bounds are always at least one and `min <= max`; the constructors
/// enforce this, so a policy in hand is always drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPolicy {
    /// Every chunk has the same size.
    Fixed(usize),
    /// Each chunk size is drawn uniformly from `min..=max`.
    Jitter {
        /// Smallest chunk size
        min: usize,
        /// Largest chunk size
        max: usize,
    },
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        ChunkPolicy::Fixed(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkPolicy {
    /// Creates a fixed-size policy.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidConfiguration` - If `size` is zero
    pub fn fixed(size: usize) -> Result<Self> {
        if size < 1 {
            return Err(StreamError::InvalidConfiguration {
                reason: "chunk size must be at least 1 byte".to_string(),
            });
        }
        Ok(ChunkPolicy::Fixed(size))
    }

    /// Creates a jittered policy, swapping the bounds when given in reverse.
    ///
    /// Equal bounds collapse to a fixed policy.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidConfiguration` - If either bound is zero
    pub fn jitter(min: usize, max: usize) -> Result<Self> {
        if min < 1 || max < 1 {
            return Err(StreamError::InvalidConfiguration {
                reason: format!("chunk bounds must be at least 1 byte, got min={min} max={max}"),
            });
        }

        let (min, max) = if min > max { (max, min) } else { (min, max) };
        if min == max {
            return Ok(ChunkPolicy::Fixed(min));
        }
        Ok(ChunkPolicy::Jitter { min, max })
    }

    /// Returns the smallest chunk this policy produces.
    pub fn min(&self) -> usize {
        match *self {
            ChunkPolicy::Fixed(size) => size,
            ChunkPolicy::Jitter { min, .. } => min,
        }
    }

    /// Returns the largest chunk this policy produces.
    pub fn max(&self) -> usize {
        match *self {
            ChunkPolicy::Fixed(size) => size,
            ChunkPolicy::Jitter { max, .. } => max,
        }
    }

    /// Draws the size of the next chunk.
    pub fn draw(&self, rng: &mut DeterministicRng) -> usize {
        match *self {
            ChunkPolicy::Fixed(size) => size,
            ChunkPolicy::Jitter { min, max } => rng.random_inclusive(min, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fixed_eight() {
        let policy = ChunkPolicy::default();
        assert_eq!(policy, ChunkPolicy::Fixed(8));
        assert_eq!(policy.min(), 8);
        assert_eq!(policy.max(), 8);
    }

    #[test]
    fn test_jitter_swaps_reversed_bounds() {
        let policy = ChunkPolicy::jitter(12, 4).unwrap();
        assert_eq!(policy, ChunkPolicy::Jitter { min: 4, max: 12 });
    }

    #[test]
    fn test_zero_bounds_rejected() {
        assert!(matches!(
            ChunkPolicy::jitter(0, 4),
            Err(StreamError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            ChunkPolicy::jitter(4, 0),
            Err(StreamError::InvalidConfiguration { .. })
        ));
        assert!(ChunkPolicy::fixed(0).is_err());
    }

    #[test]
    fn test_draw_stays_in_range() {
        let policy = ChunkPolicy::jitter(2, 6).unwrap();
        let mut rng = DeterministicRng::from_seed(3);

        for _ in 0..200 {
            let size = policy.draw(&mut rng);
            assert!((2..=6).contains(&size));
        }
    }

    #[test]
    fn test_equal_bounds_collapse() {
        assert_eq!(ChunkPolicy::jitter(5, 5).unwrap(), ChunkPolicy::Fixed(5));
    }
}
