//! Random-content stream of an exact total size.

use trickle_core::{
    ChunkPolicy, ClosableByteStream, DeterministicRng, Result, StreamReader, StreamWriter,
    TrickleConfig, spawn_generator,
};

/// Builder for a stream of `size` pseudorandom bytes.
///
/// Without chunk bounds every write is `default_chunk_size` bytes (8 unless
/// configured). Setting `chunk_min` and/or `chunk_max` switches to jittered
/// chunking; a bound left unset falls back to the default chunk size and
/// reversed bounds are swapped.
#[derive(Debug, Clone)]
pub struct RandomStreamBuilder {
    size: usize,
    chunk_min: Option<usize>,
    chunk_max: Option<usize>,
    default_chunk_size: usize,
    seed: Option<u64>,
}

impl RandomStreamBuilder {
    /// Creates builder for a stream of exactly `size` bytes.
    pub fn new(size: usize) -> Self {
        let config = TrickleConfig::default();
        Self {
            size,
            chunk_min: None,
            chunk_max: None,
            default_chunk_size: config.random.default_chunk_size,
            seed: None,
        }
    }

    /// Applies chunk size and seed defaults from `config`.
    pub fn config(mut self, config: &TrickleConfig) -> Self {
        self.default_chunk_size = config.random.default_chunk_size;
        self.seed = self.seed.or(config.deterministic_seed);
        self
    }

    /// Sets the smallest jittered chunk size.
    pub fn chunk_min(mut self, min: usize) -> Self {
        self.chunk_min = Some(min);
        self
    }

    /// Sets the largest jittered chunk size.
    pub fn chunk_max(mut self, max: usize) -> Self {
        self.chunk_max = Some(max);
        self
    }

    /// Seeds chunk sizes and content for reproducible output.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resolves the configured chunk bounds into a policy.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidConfiguration` - If a bound or the default chunk size is zero
    pub fn chunk_policy(&self) -> Result<ChunkPolicy> {
        match (self.chunk_min, self.chunk_max) {
            (None, None) => ChunkPolicy::fixed(self.default_chunk_size),
            (min, max) => ChunkPolicy::jitter(
                min.unwrap_or(self.default_chunk_size),
                max.unwrap_or(self.default_chunk_size),
            ),
        }
    }

    /// Validates the options and starts the producer.
    ///
    /// A zero size returns an already closed, empty stream without
    /// spawning anything. Otherwise must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidConfiguration` - If the chunk bounds are invalid
    pub fn build(self) -> Result<StreamReader> {
        let policy = self.chunk_policy()?;
        Ok(start_random_stream(
            self.size,
            policy,
            DeterministicRng::from_optional_seed(self.seed),
        ))
    }
}

/// Creates a stream of `size` random bytes written in 8-byte chunks.
///
/// Must be called within a tokio runtime unless `size` is zero.
pub fn random_stream(size: usize) -> StreamReader {
    start_random_stream(size, ChunkPolicy::default(), DeterministicRng::from_entropy())
}

fn start_random_stream(size: usize, policy: ChunkPolicy, rng: DeterministicRng) -> StreamReader {
    let (writer, reader) = ClosableByteStream::new().split();

    if size == 0 {
        // Fresh stream, cannot already be closed.
        let _ = writer.close();
        return reader;
    }

    tracing::debug!(size, ?policy, seed = rng.seed(), "Starting random stream");
    spawn_generator("random", writer, move |writer| {
        produce_random(writer, size, policy, rng)
    });
    reader
}

async fn produce_random(
    writer: StreamWriter,
    size: usize,
    policy: ChunkPolicy,
    mut rng: DeterministicRng,
) -> Result<()> {
    let mut chunk = vec![0u8; policy.max().min(size)];
    let mut remaining = size;

    while remaining >= policy.min() {
        let len = policy.draw(&mut rng).min(remaining);
        rng.fill_bytes(&mut chunk[..len]);
        writer.write(&chunk[..len])?;
        remaining -= len;

        tracing::trace!(len, remaining, "Wrote random chunk");
        tokio::task::yield_now().await;
    }

    // Tail shorter than the smallest chunk
    if remaining > 0 {
        rng.fill_bytes(&mut chunk[..remaining]);
        writer.write(&chunk[..remaining])?;
        tracing::trace!(len = remaining, "Wrote random tail");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use trickle_core::{StreamError, StreamState};

    use super::*;

    async fn drain(mut reader: StreamReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[test]
    fn test_zero_size_is_closed_immediately() {
        let reader = random_stream(0);
        let mut buf = [0u8; 4];

        assert_eq!(reader.state(), StreamState::ClosedDraining);
        assert_eq!(reader.read(&mut buf), Err(StreamError::EndOfStream));
    }

    #[tokio::test]
    async fn test_exact_size_default_policy() {
        for size in [1, 7, 8, 9, 16, 42] {
            let bytes = drain(random_stream(size)).await;
            assert_eq!(bytes.len(), size, "size {size}");
        }
    }

    #[tokio::test]
    async fn test_fixed_chunks_at_exact_multiple() {
        let mut reader = RandomStreamBuilder::new(24).seed(5).build().unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out.len(), 24);
        assert_eq!(reader.stats().writes, 3);
    }

    #[tokio::test]
    async fn test_chunk_max_at_usize_max() {
        let mut reader = RandomStreamBuilder::new(10)
            .chunk_min(1)
            .chunk_max(usize::MAX)
            .seed(1)
            .build()
            .unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(reader.terminal_error(), None);
    }

    #[tokio::test]
    async fn test_jittered_chunks_bounded() {
        let mut reader = RandomStreamBuilder::new(500)
            .chunk_min(4)
            .chunk_max(12)
            .seed(11)
            .build()
            .unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        let stats = reader.stats();

        assert_eq!(out.len(), 500);
        assert!(stats.writes >= 500 / 12);
        assert!(stats.writes <= 500 / 4 + 1);
    }

    #[tokio::test]
    async fn test_same_seed_same_bytes() {
        let first = drain(RandomStreamBuilder::new(64).seed(9).build().unwrap()).await;
        let second = drain(RandomStreamBuilder::new(64).seed(9).build().unwrap()).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_bounds_fail_before_spawn() {
        let result = RandomStreamBuilder::new(10).chunk_min(0).build();
        assert!(matches!(
            result,
            Err(StreamError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_single_bound_uses_default_for_other() {
        let policy = RandomStreamBuilder::new(10).chunk_max(20).chunk_policy().unwrap();
        assert_eq!(policy, ChunkPolicy::Jitter { min: 8, max: 20 });

        let policy = RandomStreamBuilder::new(10).chunk_min(20).chunk_policy().unwrap();
        assert_eq!(policy, ChunkPolicy::Jitter { min: 8, max: 20 });
    }
}
