//! Shared helpers for Trickle integration tests.
//!
//! The helpers drain streams through the polling read path, the way a
//! timer-driven consumer would, and return the collected bytes together
//! with the error that ended the drain.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use trickle_core::{ClosableByteStream, StreamError, StreamReader};

/// Default interval between polls of an empty, open stream.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls `reader` with `buf_size` reads until it reports an error.
///
/// Sleeps `POLL_INTERVAL` whenever the stream is open but empty.
pub async fn drain_polling(reader: &StreamReader, buf_size: usize) -> (Vec<u8>, StreamError) {
    let mut out = Vec::new();
    let mut buf = vec![0u8; buf_size];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => tokio::time::sleep(POLL_INTERVAL).await,
            Ok(count) => out.extend_from_slice(&buf[..count]),
            Err(error) => return (out, error),
        }
    }
}

/// Drains an already closed stream without waiting.
///
/// # Panics
///
/// Panics if the stream is still open and empty.
pub fn drain_closed(stream: &ClosableByteStream, buf_size: usize) -> (Vec<u8>, StreamError) {
    let mut out = Vec::new();
    let mut buf = vec![0u8; buf_size];

    loop {
        match stream.read(&mut buf) {
            Ok(0) => panic!("drain_closed called on an open stream"),
            Ok(count) => out.extend_from_slice(&buf[..count]),
            Err(error) => return (out, error),
        }
    }
}

/// Endless source of `fill` bytes that counts the reads issued against it.
#[derive(Debug, Clone)]
pub struct CountingSource {
    fill: u8,
    reads: Arc<AtomicUsize>,
}

impl CountingSource {
    /// Creates source yielding `fill` forever.
    pub fn new(fill: u8) -> Self {
        Self {
            fill,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns how many reads have been served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl AsyncRead for CountingSource {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let len = buf.remaining();
        buf.initialize_unfilled_to(len).fill(self.fill);
        buf.advance(len);
        Poll::Ready(Ok(()))
    }
}
