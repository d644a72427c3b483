//! Fixed-pattern stream: a run of header bytes followed by a run of body bytes.

use std::time::Duration;

use trickle_core::{
    ChunkPolicy, ClosableByteStream, DeterministicRng, Result, StreamReader, StreamWriter,
    TrickleConfig, spawn_generator,
};

/// Shape of a repeater stream's content and delivery budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeaterPattern {
    /// Byte repeated throughout the header region
    pub header: u8,
    /// Length of the header region
    pub header_size: usize,
    /// Byte repeated throughout the body region
    pub body: u8,
    /// Length of the body region
    pub body_size: usize,
    /// Wall time over which the whole stream is delivered
    pub total_time: Duration,
}

impl RepeaterPattern {
    /// Returns the total number of bytes the stream delivers.
    pub fn total_bytes(&self) -> usize {
        self.header_size + self.body_size
    }

    /// Returns the delay spent per delivered byte.
    pub fn per_byte_delay(&self) -> Duration {
        match self.total_bytes() {
            0 => Duration::ZERO,
            total => {
                let nanos = self.total_time.as_nanos() / total as u128;
                Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
            }
        }
    }

    /// Fills `chunk` with the `len` bytes that follow the first `offset` bytes.
    ///
    /// A chunk straddling the boundary holds the rest of the header first,
    /// then the start of the body.
    fn compose(&self, offset: usize, len: usize, chunk: &mut Vec<u8>) {
        let header_part = len.min(self.header_size.saturating_sub(offset));
        chunk.clear();
        chunk.resize(header_part, self.header);
        chunk.resize(len, self.body);
    }
}

/// Builder for a header/body repeater stream.
#[derive(Debug, Clone)]
pub struct RepeaterStreamBuilder {
    pattern: RepeaterPattern,
    chunk_min: usize,
    chunk_max: usize,
    seed: Option<u64>,
}

impl RepeaterStreamBuilder {
    /// Creates builder for `header_size` header bytes then `body_size` body bytes.
    pub fn new(
        header: u8,
        header_size: usize,
        body: u8,
        body_size: usize,
        total_time: Duration,
    ) -> Self {
        let config = TrickleConfig::default();
        Self {
            pattern: RepeaterPattern {
                header,
                header_size,
                body,
                body_size,
                total_time,
            },
            chunk_min: config.repeater.chunk_min,
            chunk_max: config.repeater.chunk_max,
            seed: None,
        }
    }

    /// Applies chunk range and seed defaults from `config`.
    pub fn config(mut self, config: &TrickleConfig) -> Self {
        self.chunk_min = config.repeater.chunk_min;
        self.chunk_max = config.repeater.chunk_max;
        self.seed = self.seed.or(config.deterministic_seed);
        self
    }

    /// Sets the size range of each write.
    pub fn chunk_range(mut self, min: usize, max: usize) -> Self {
        self.chunk_min = min;
        self.chunk_max = max;
        self
    }

    /// Seeds the chunk sizes for reproducible delivery.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the options and starts the producer.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidConfiguration` - If a chunk bound is zero
    pub fn build(self) -> Result<StreamReader> {
        let chunks = ChunkPolicy::jitter(self.chunk_min, self.chunk_max)?;
        Ok(start_repeater_stream(
            self.pattern,
            chunks,
            DeterministicRng::from_optional_seed(self.seed),
        ))
    }
}

/// Creates a stream of `header_size` copies of `header` then `body_size`
/// copies of `body`, delivered in 1-3 byte writes over about `total_time`.
///
/// Must be called within a tokio runtime.
pub fn repeater_stream(
    header: u8,
    header_size: usize,
    body: u8,
    body_size: usize,
    total_time: Duration,
) -> StreamReader {
    let repeater = TrickleConfig::default().repeater;
    let pattern = RepeaterPattern {
        header,
        header_size,
        body,
        body_size,
        total_time,
    };
    let chunks = ChunkPolicy::Jitter {
        min: repeater.chunk_min,
        max: repeater.chunk_max,
    };
    start_repeater_stream(pattern, chunks, DeterministicRng::from_entropy())
}

fn start_repeater_stream(
    pattern: RepeaterPattern,
    chunks: ChunkPolicy,
    rng: DeterministicRng,
) -> StreamReader {
    let (writer, reader) = ClosableByteStream::new().split();

    tracing::debug!(?pattern, ?chunks, "Starting repeater stream");
    spawn_generator("repeater", writer, move |writer| {
        produce_pattern(writer, pattern, chunks, rng)
    });
    reader
}

async fn produce_pattern(
    writer: StreamWriter,
    pattern: RepeaterPattern,
    chunks: ChunkPolicy,
    mut rng: DeterministicRng,
) -> Result<()> {
    let total = pattern.total_bytes();
    if total == 0 {
        tokio::time::sleep(pattern.total_time).await;
        return Ok(());
    }

    let per_byte = pattern.per_byte_delay();
    let mut chunk = Vec::with_capacity(chunks.max());
    let mut offset = 0;

    while offset < total {
        let len = chunks.draw(&mut rng).min(total - offset);
        pattern.compose(offset, len, &mut chunk);
        writer.write(&chunk)?;
        offset += len;

        tracing::trace!(len, offset, total, "Wrote pattern chunk");
        tokio::time::sleep(per_byte * len as u32).await;
    }

    Ok(())
}
