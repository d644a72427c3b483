//! Re-chunking and pacing wrapper around an existing byte source.
//!
//! Two tasks joined by a bounded queue: the puller reads small randomly
//! sized chunks from the source, the pacer writes them to a fresh stream
//! and makes every chunk cost at least one tick of wall time. The queue
//! bound is the only backpressure in the pipeline.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use trickle_core::{
    ChunkPolicy, ClosableByteStream, DeterministicRng, Result, StreamError, StreamReader,
    StreamWriter, TrickleConfig, spawn_generator,
};

type PulledChunk = Result<Bytes>;

/// Upper bound on a single read buffer, whatever the pull range allows.
const MAX_PULL_SIZE: usize = 64 * 1024;

/// Builder for a paced copy of an async byte source.
pub struct LagStreamBuilder<R> {
    source: R,
    tick_delay: Duration,
    queue_capacity: usize,
    pull_min: usize,
    pull_max: usize,
    seed: Option<u64>,
}

impl<R> LagStreamBuilder<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Creates builder wrapping `source` with `tick_delay` per chunk.
    pub fn new(source: R, tick_delay: Duration) -> Self {
        let config = TrickleConfig::default();
        Self {
            source,
            tick_delay,
            queue_capacity: config.lag.queue_capacity,
            pull_min: config.lag.pull_min,
            pull_max: config.lag.pull_max,
            seed: None,
        }
    }

    /// Creates builder wrapping `source` with every option taken from `config`,
    /// including `config.lag.tick_delay`.
    pub fn from_config(source: R, config: &TrickleConfig) -> Self {
        Self::new(source, config.lag.tick_delay).config(config)
    }

    /// Applies queue, pull range and seed defaults from `config`.
    ///
    /// The tick delay given to [`Self::new`] is kept.
    pub fn config(mut self, config: &TrickleConfig) -> Self {
        self.queue_capacity = config.lag.queue_capacity;
        self.pull_min = config.lag.pull_min;
        self.pull_max = config.lag.pull_max;
        self.seed = self.seed.or(config.deterministic_seed);
        self
    }

    /// Sets how many pulled chunks may wait for the pacer.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the size range of reads issued against the source.
    pub fn pull_range(mut self, min: usize, max: usize) -> Self {
        self.pull_min = min;
        self.pull_max = max;
        self
    }

    /// Seeds the pull sizes for reproducible chunking.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the options and starts the puller and pacer.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidConfiguration` - If the queue capacity or a pull bound is zero
    pub fn build(self) -> Result<StreamReader> {
        if self.queue_capacity < 1 {
            return Err(StreamError::InvalidConfiguration {
                reason: "lag queue capacity must be at least 1 chunk".to_string(),
            });
        }
        let pulls = ChunkPolicy::jitter(self.pull_min, self.pull_max)?;

        Ok(start_lag_stream(
            self.source,
            self.tick_delay,
            self.queue_capacity,
            pulls,
            DeterministicRng::from_optional_seed(self.seed),
        ))
    }
}

/// Re-emits `source` in 3-5 byte chunks, at most one chunk per `tick_delay`.
///
/// Must be called within a tokio runtime.
pub fn lag_stream<R>(source: R, tick_delay: Duration) -> StreamReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let lag = TrickleConfig::default().lag;
    let pulls = ChunkPolicy::Jitter {
        min: lag.pull_min,
        max: lag.pull_max,
    };
    start_lag_stream(
        source,
        tick_delay,
        lag.queue_capacity,
        pulls,
        DeterministicRng::from_entropy(),
    )
}

fn start_lag_stream<R>(
    source: R,
    tick_delay: Duration,
    queue_capacity: usize,
    pulls: ChunkPolicy,
    rng: DeterministicRng,
) -> StreamReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (writer, reader) = ClosableByteStream::new().split();
    let (sender, mut receiver) = mpsc::channel(queue_capacity);

    tracing::debug!(?tick_delay, queue_capacity, ?pulls, "Starting lag stream");
    let puller = tokio::spawn(pull_source(source, pulls, rng, sender));

    spawn_generator("lag", writer, move |writer| async move {
        let paced = pace_chunks(&writer, &mut receiver, tick_delay).await;
        finish_puller(puller, paced).await
    });
    reader
}

/// Reads chunks from `source` until end of stream or failure.
///
/// A failure is queued behind the chunks already pulled so the pacer
/// delivers them before recording the error.
async fn pull_source<R>(
    mut source: R,
    pulls: ChunkPolicy,
    mut rng: DeterministicRng,
    chunks: mpsc::Sender<PulledChunk>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let mut buf = vec![0u8; pulls.draw(&mut rng).min(MAX_PULL_SIZE)];
        let pulled = match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(count) => {
                buf.truncate(count);
                Ok(Bytes::from(buf))
            }
            Err(error) => Err(upstream_error(error)),
        };

        let failed = pulled.is_err();
        if chunks.send(pulled).await.is_err() {
            tracing::debug!("Pacer stopped, lag puller exiting");
            return;
        }
        if failed {
            return;
        }
    }

    tracing::debug!("Lag source exhausted");
}

/// Writes queued chunks, spending at least `tick_delay` per chunk.
///
/// Each tick starts when the pacer begins waiting for the chunk, so
/// delivering N chunks takes at least N ticks.
async fn pace_chunks(
    writer: &StreamWriter,
    receiver: &mut mpsc::Receiver<PulledChunk>,
    tick_delay: Duration,
) -> Result<()> {
    loop {
        let tick = Instant::now();
        let Some(pulled) = receiver.recv().await else {
            return Ok(());
        };

        let chunk = pulled?;
        writer.write(&chunk)?;
        tracing::trace!(len = chunk.len(), "Paced chunk");

        let elapsed = tick.elapsed();
        if elapsed < tick_delay {
            tokio::time::sleep(tick_delay - elapsed).await;
        }
    }
}

async fn finish_puller(puller: JoinHandle<()>, paced: Result<()>) -> Result<()> {
    if paced.is_err() {
        puller.abort();
        return paced;
    }

    puller.await.map_err(|error| StreamError::ProducerAborted {
        reason: format!("lag puller stopped: {error}"),
    })
}

/// Maps a source failure onto the error recorded on the output stream.
///
/// Terminal errors from an upstream trickle stream pass through unchanged.
fn upstream_error(error: io::Error) -> StreamError {
    match error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<StreamError>())
    {
        Some(inner) if inner.is_terminal() => inner.clone(),
        _ => StreamError::Upstream {
            reason: error.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn test_lag_preserves_content() {
        let mut reader = LagStreamBuilder::new(&b"hello world"[..], Duration::from_millis(2))
            .seed(4)
            .build()
            .unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn test_lag_paces_each_chunk() {
        let tick = Duration::from_millis(10);
        let started = Instant::now();
        let mut reader = lag_stream(&b"0123456789abcdefghij"[..], tick);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        let chunks = reader.stats().writes as u32;

        assert_eq!(out.len(), 20);
        assert!((4..=7).contains(&chunks), "20 bytes in 3-5 byte pulls");
        assert!(started.elapsed() >= tick * chunks);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_recorded() {
        let source = tokio_test::io::Builder::new()
            .read(b"abc")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"))
            .build();
        let mut reader = lag_stream(source, Duration::from_millis(1));

        let mut out = Vec::new();
        let error = reader.read_to_end(&mut out).await.unwrap_err();

        assert_eq!(out, b"abc");
        assert!(error.to_string().contains("peer reset"));
        assert!(matches!(
            reader.terminal_error(),
            Some(StreamError::Upstream { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_queue_capacity() {
        let result = LagStreamBuilder::new(&b""[..], Duration::ZERO)
            .queue_capacity(0)
            .build();
        assert!(matches!(
            result,
            Err(StreamError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_unbounded_pull_range_is_capped() {
        let payload = vec![7u8; 100];
        let source = std::io::Cursor::new(payload.clone());
        let mut reader = LagStreamBuilder::new(source, Duration::ZERO)
            .pull_range(1, usize::MAX)
            .seed(2)
            .build()
            .unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, payload);
        assert_eq!(reader.terminal_error(), None);
    }

    #[test]
    fn test_terminal_errors_pass_through() {
        let recorded = StreamError::ProducerAborted {
            reason: "random stopped before finishing".to_string(),
        };
        let error: io::Error = recorded.clone().into();
        assert_eq!(upstream_error(error), recorded);

        let plain = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        assert!(matches!(
            upstream_error(plain),
            StreamError::Upstream { .. }
        ));
    }
}
