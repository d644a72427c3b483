//! Injectable random source for chunk sizing and payload bytes.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic random number generator owned by a single stream producer.
///
/// Uses ChaCha8 for fast pseudorandom numbers with seed-based generation,
/// so a stream built from the same seed chunks its output identically.
/// The bytes are not suitable for anything cryptographic.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DeterministicRng {
    /// Creates deterministic RNG from seed value.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Creates RNG with a freshly drawn seed.
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    /// Creates RNG from an optional seed, drawing one when absent.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }

    /// Returns the seed used for this RNG.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates random number in range [min, max).
    pub fn random_range(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        min + (self.rng.next_u64() % (max - min))
    }

    /// Generates random size in range [min, max].
    ///
    /// Valid for the full `usize` range, including `max == usize::MAX`.
    pub fn random_inclusive(&mut self, min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    /// Fills the slice with pseudorandom bytes.
    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut first = DeterministicRng::from_seed(7);
        let mut second = DeterministicRng::from_seed(7);

        for _ in 0..32 {
            assert_eq!(first.random_range(0, 1000), second.random_range(0, 1000));
        }

        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        first.fill_bytes(&mut a);
        second.fill_bytes(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_inclusive_bounds() {
        let mut rng = DeterministicRng::from_seed(99);
        let mut seen = [false; 3];

        for _ in 0..500 {
            let value = rng.random_inclusive(3, 5);
            assert!((3..=5).contains(&value));
            seen[value - 3] = true;
        }

        assert!(seen.iter().all(|hit| *hit), "every size should be drawn");
        assert_eq!(rng.random_inclusive(4, 4), 4);
    }

    #[test]
    fn test_inclusive_upper_bound_at_usize_max() {
        let mut rng = DeterministicRng::from_seed(3);

        for _ in 0..100 {
            assert!(rng.random_inclusive(1, usize::MAX) >= 1);
        }
        assert_eq!(rng.random_inclusive(usize::MAX, usize::MAX), usize::MAX);
    }

    #[test]
    fn test_optional_seed() {
        assert_eq!(DeterministicRng::from_optional_seed(Some(12)).seed(), 12);
    }
}
