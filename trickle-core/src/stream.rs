//! Thread-safe, closable in-memory byte stream.
//!
//! A [`ClosableByteStream`] holds the bytes a producer has written but no
//! reader has consumed yet. Closing only forbids further writes: buffered
//! bytes keep draining, and reads report end of stream once the buffer is
//! empty. Every operation takes the same lock for its whole duration, so
//! no call observes a mix of pending bytes and closed state.
//!
//! # Polling reads
//!
//! [`ClosableByteStream::read`] never waits. On an empty stream that is
//! still open it returns `Ok(0)`, which is *not* end of stream: callers
//! retry on their own timer. End of stream is `Err(StreamError::EndOfStream)`.
//! Consumers that want to await data use the [`AsyncRead`] implementation
//! on [`StreamReader`] instead, where `Ok(0)` does mean end of stream.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, ReadBuf};

use crate::errors::{Result, StreamError};

/// Lifecycle of a stream, derived from its buffer and close flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Writes allowed; reads return buffered bytes or nothing yet.
    Open,
    /// Closed for writing; buffered bytes still drain.
    ClosedDraining,
    /// Closed, and a read has found the buffer empty.
    Exhausted,
}

/// Counters describing the traffic a stream has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Bytes accepted by writes, including seeded contents
    pub bytes_written: u64,
    /// Bytes handed out by reads
    pub bytes_read: u64,
    /// Successful write calls
    pub writes: u64,
    /// Read calls that returned bytes
    pub reads: u64,
}

#[derive(Debug, Default)]
struct Inner {
    pending: BytesMut,
    closed: bool,
    exhausted: bool,
    terminal_error: Option<StreamError>,
    read_waker: Option<Waker>,
    stats: StreamStats,
}

impl Inner {
    fn drain_into(&mut self, dest: &mut [u8]) -> usize {
        let count = self.pending.len().min(dest.len());
        dest[..count].copy_from_slice(&self.pending[..count]);
        self.pending.advance(count);
        self.stats.bytes_read += count as u64;
        self.stats.reads += 1;
        count
    }

    /// Result of a read that found nothing buffered on a closed stream.
    fn end_of_stream(&mut self) -> StreamError {
        self.exhausted = true;
        self.terminal_error
            .clone()
            .unwrap_or(StreamError::EndOfStream)
    }
}

/// Synchronized byte buffer with half-close semantics.
///
/// Shared between exactly one producer and its consumer through
/// [`StreamWriter`] and [`StreamReader`] handles, see [`Self::split`].
#[derive(Debug, Default)]
pub struct ClosableByteStream {
    inner: Mutex<Inner>,
}

impl ClosableByteStream {
    /// Creates an empty, open stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an open stream with `contents` already buffered.
    pub fn with_contents(contents: &[u8]) -> Self {
        let stream = Self::new();
        {
            let mut inner = stream.inner.lock();
            inner.pending.extend_from_slice(contents);
            inner.stats.bytes_written = contents.len() as u64;
        }
        stream
    }

    /// Splits the stream into its producer and consumer halves.
    pub fn split(self) -> (StreamWriter, StreamReader) {
        let stream = Arc::new(self);
        (
            StreamWriter {
                stream: Arc::clone(&stream),
            },
            StreamReader { stream },
        )
    }

    /// Appends `bytes` to the buffer and returns how many were accepted.
    ///
    /// Writing an empty slice to an open stream is a no-op returning 0.
    ///
    /// # Errors
    ///
    /// - `StreamError::StreamClosed` - If the stream was closed; nothing is buffered
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        let waker = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(StreamError::StreamClosed);
            }
            if bytes.is_empty() {
                return Ok(0);
            }

            inner.pending.extend_from_slice(bytes);
            inner.stats.bytes_written += bytes.len() as u64;
            inner.stats.writes += 1;
            inner.read_waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
        Ok(bytes.len())
    }

    /// Moves up to `buf.len()` buffered bytes into `buf`.
    ///
    /// Buffered bytes drain even after close. Returns `Ok(0)` when the
    /// stream is open but nothing is buffered yet.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidArgument` - If `buf` has zero capacity
    /// - `StreamError::EndOfStream` - If the stream is closed and drained
    /// - `StreamError::Upstream` / `StreamError::ProducerAborted` - If the
    ///   producer recorded a terminal error and the buffer is drained
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(StreamError::InvalidArgument {
                reason: "cannot read into a zero-capacity buffer".to_string(),
            });
        }

        let mut inner = self.inner.lock();
        if !inner.pending.is_empty() {
            return Ok(inner.drain_into(buf));
        }
        if inner.closed {
            return Err(inner.end_of_stream());
        }
        Ok(0)
    }

    /// Closes the stream for writing. Buffered bytes are kept.
    ///
    /// # Errors
    ///
    /// - `StreamError::AlreadyClosed` - If the stream was already closed
    pub fn close(&self) -> Result<()> {
        self.close_with(None)
    }

    /// Closes the stream and records `error` as its terminal state.
    ///
    /// Readers drain the buffered bytes first, then receive `error` on every
    /// read instead of end of stream.
    ///
    /// # Errors
    ///
    /// - `StreamError::AlreadyClosed` - If the stream was already closed; the error is dropped
    pub fn fail(&self, error: StreamError) -> Result<()> {
        self.close_with(Some(error))
    }

    fn close_with(&self, error: Option<StreamError>) -> Result<()> {
        let waker = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(StreamError::AlreadyClosed);
            }
            inner.closed = true;
            inner.terminal_error = error;
            inner.read_waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
        Ok(())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> StreamState {
        let inner = self.inner.lock();
        match (inner.closed, inner.exhausted) {
            (false, _) => StreamState::Open,
            (true, false) => StreamState::ClosedDraining,
            (true, true) => StreamState::Exhausted,
        }
    }

    /// Returns a snapshot of the traffic counters.
    pub fn stats(&self) -> StreamStats {
        self.inner.lock().stats
    }

    /// Returns the number of buffered, unread bytes.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Checks if the stream is closed for writing.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Returns the terminal error recorded by the producer, if any.
    pub fn terminal_error(&self) -> Option<StreamError> {
        self.inner.lock().terminal_error.clone()
    }

    fn poll_read_into(&self, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let mut inner = self.inner.lock();
        if !inner.pending.is_empty() {
            let count = inner.pending.len().min(buf.remaining());
            let dest = buf.initialize_unfilled_to(count);
            inner.drain_into(dest);
            buf.advance(count);
            return Poll::Ready(Ok(()));
        }

        if inner.closed {
            return match inner.end_of_stream() {
                StreamError::EndOfStream => Poll::Ready(Ok(())),
                error => Poll::Ready(Err(error.into())),
            };
        }

        inner.read_waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Producer half of a stream: write, close and fail.
///
/// Held only by the task generating the stream's content. Not `Clone`:
/// each stream has exactly one producer.
#[derive(Debug)]
pub struct StreamWriter {
    stream: Arc<ClosableByteStream>,
}

impl StreamWriter {
    /// Second handle to the same stream for the generator's close guard.
    pub(crate) fn handle(&self) -> Self {
        Self {
            stream: Arc::clone(&self.stream),
        }
    }

    /// Appends bytes, see [`ClosableByteStream::write`].
    ///
    /// # Errors
    ///
    /// - `StreamError::StreamClosed` - If the stream was closed
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        self.stream.write(bytes)
    }

    /// Closes for writing, see [`ClosableByteStream::close`].
    ///
    /// # Errors
    ///
    /// - `StreamError::AlreadyClosed` - If the stream was already closed
    pub fn close(&self) -> Result<()> {
        self.stream.close()
    }

    /// Closes with a terminal error, see [`ClosableByteStream::fail`].
    ///
    /// # Errors
    ///
    /// - `StreamError::AlreadyClosed` - If the stream was already closed
    pub fn fail(&self, error: StreamError) -> Result<()> {
        self.stream.fail(error)
    }

    /// Checks if the stream is closed, by either side.
    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }
}

/// Consumer half of a stream: read and close.
///
/// Closing from this side cancels the producer, whose next write fails
/// with `StreamError::StreamClosed`.
#[derive(Debug)]
pub struct StreamReader {
    stream: Arc<ClosableByteStream>,
}

impl StreamReader {
    /// Polling read, see [`ClosableByteStream::read`].
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidArgument` - If `buf` has zero capacity
    /// - `StreamError::EndOfStream` - If the stream is closed and drained
    /// - `StreamError::Upstream` / `StreamError::ProducerAborted` - Recorded terminal error
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf)
    }

    /// Closes the stream for writing.
    ///
    /// # Errors
    ///
    /// - `StreamError::AlreadyClosed` - If the stream was already closed
    pub fn close(&self) -> Result<()> {
        self.stream.close()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.stream.state()
    }

    /// Returns a snapshot of the traffic counters.
    pub fn stats(&self) -> StreamStats {
        self.stream.stats()
    }

    /// Returns the number of buffered, unread bytes.
    pub fn pending_len(&self) -> usize {
        self.stream.pending_len()
    }

    /// Returns the terminal error recorded by the producer, if any.
    pub fn terminal_error(&self) -> Option<StreamError> {
        self.stream.terminal_error()
    }
}

impl AsyncRead for StreamReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.stream.poll_read_into(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    fn drain(stream: &ClosableByteStream, chunk: usize) -> (Vec<u8>, StreamError) {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            match stream.read(&mut buf) {
                Ok(count) => out.extend_from_slice(&buf[..count]),
                Err(error) => return (out, error),
            }
        }
    }

    #[test]
    fn test_write_then_read_preserves_order() {
        let stream = ClosableByteStream::new();
        assert_eq!(stream.write(b"hello ").unwrap(), 6);
        assert_eq!(stream.write(b"world").unwrap(), 5);
        stream.close().unwrap();

        let (bytes, end) = drain(&stream, 4);
        assert_eq!(bytes, b"hello world");
        assert_eq!(end, StreamError::EndOfStream);
    }

    #[test]
    fn test_empty_open_read_polls() {
        let stream = ClosableByteStream::new();
        let mut buf = [0u8; 4];

        assert_eq!(stream.read(&mut buf), Ok(0));
        assert_eq!(stream.state(), StreamState::Open);
    }

    #[test]
    fn test_zero_capacity_read_rejected() {
        let stream = ClosableByteStream::with_contents(b"abc");
        let mut buf = [0u8; 0];

        assert!(matches!(
            stream.read(&mut buf),
            Err(StreamError::InvalidArgument { .. })
        ));
        assert_eq!(stream.pending_len(), 3);
    }

    #[test]
    fn test_double_close() {
        let stream = ClosableByteStream::new();
        assert_eq!(stream.close(), Ok(()));
        assert_eq!(stream.close(), Err(StreamError::AlreadyClosed));
    }

    #[test]
    fn test_write_after_close_does_not_mutate() {
        let stream = ClosableByteStream::with_contents(b"ab");
        stream.close().unwrap();

        assert_eq!(stream.write(b"cd"), Err(StreamError::StreamClosed));
        assert_eq!(stream.write(b""), Err(StreamError::StreamClosed));
        assert_eq!(stream.pending_len(), 2);
    }

    #[test]
    fn test_empty_write_is_noop() {
        let stream = ClosableByteStream::new();
        assert_eq!(stream.write(&[]), Ok(0));
        assert_eq!(stream.stats().writes, 0);
    }

    #[test]
    fn test_state_transitions() {
        let stream = ClosableByteStream::with_contents(b"xy");
        let mut buf = [0u8; 8];
        assert_eq!(stream.state(), StreamState::Open);

        stream.close().unwrap();
        assert_eq!(stream.state(), StreamState::ClosedDraining);

        assert_eq!(stream.read(&mut buf), Ok(2));
        assert_eq!(stream.state(), StreamState::ClosedDraining);

        assert_eq!(stream.read(&mut buf), Err(StreamError::EndOfStream));
        assert_eq!(stream.state(), StreamState::Exhausted);
        assert_eq!(stream.read(&mut buf), Err(StreamError::EndOfStream));
    }

    #[test]
    fn test_terminal_error_after_drain() {
        let stream = ClosableByteStream::new();
        stream.write(b"partial").unwrap();
        let error = StreamError::Upstream {
            reason: "reset by peer".to_string(),
        };
        stream.fail(error.clone()).unwrap();

        let (bytes, end) = drain(&stream, 3);
        assert_eq!(bytes, b"partial");
        assert_eq!(end, error);
        assert_eq!(stream.terminal_error(), Some(error));
        assert_eq!(stream.fail(StreamError::EndOfStream), Err(StreamError::AlreadyClosed));
    }

    #[test]
    fn test_stats_track_traffic() {
        let stream = ClosableByteStream::with_contents(b"seed");
        stream.write(b"more").unwrap();
        let mut buf = [0u8; 5];
        stream.read(&mut buf).unwrap();

        let stats = stream.stats();
        assert_eq!(stats.bytes_written, 8);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.bytes_read, 5);
        assert_eq!(stats.reads, 1);
    }

    #[test]
    fn test_reader_close_cancels_writer() {
        let (writer, reader) = ClosableByteStream::new().split();
        reader.close().unwrap();

        assert!(writer.is_closed());
        assert_eq!(writer.write(b"late"), Err(StreamError::StreamClosed));
        assert_eq!(writer.close(), Err(StreamError::AlreadyClosed));
    }

    #[test]
    fn test_writer_handle_shares_stream() {
        let (writer, reader) = ClosableByteStream::new().split();
        let handle = writer.handle();

        writer.write(b"ab").unwrap();
        handle.close().unwrap();

        assert!(writer.is_closed());
        assert_eq!(writer.write(b"c"), Err(StreamError::StreamClosed));
        assert_eq!(reader.pending_len(), 2);
    }

    #[tokio::test]
    async fn test_async_read_waits_for_writer() {
        let (writer, mut reader) = ClosableByteStream::new().split();

        let producer = tokio::spawn(async move {
            for part in [&b"one "[..], b"two ", b"three"] {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                writer.write(part).unwrap();
            }
            writer.close().unwrap();
        });

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        producer.await.unwrap();

        assert_eq!(out, b"one two three");
        assert_eq!(reader.state(), StreamState::Exhausted);
    }

    #[tokio::test]
    async fn test_async_read_surfaces_terminal_error() {
        let (writer, mut reader) = ClosableByteStream::new().split();
        writer.write(b"abc").unwrap();
        writer
            .fail(StreamError::ProducerAborted {
                reason: "boom".to_string(),
            })
            .unwrap();

        let mut out = Vec::new();
        let error = reader.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(out, b"abc");
        assert_eq!(error.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_async_read_pending_until_write() {
        let (writer, mut reader) = ClosableByteStream::new().split();
        let mut buf = [0u8; 4];

        let mut task =
            tokio_test::task::spawn(async move { AsyncReadExt::read(&mut reader, &mut buf).await });
        tokio_test::assert_pending!(task.poll());

        writer.write(b"hi").unwrap();
        assert!(task.is_woken());
        let count = tokio_test::assert_ready_ok!(task.poll());
        assert_eq!(count, 2);
    }
}
