//! Background tasks that own the write half of a stream.
//!
//! A generator runs an arbitrary production function against a
//! [`StreamWriter`] and closes the stream on every exit path, so the
//! consumer always ends up observing either end of stream or a recorded
//! terminal error.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::errors::{Result, StreamError};
use crate::stream::StreamWriter;

/// Spawns `produce` on the tokio runtime as the sole writer of a stream.
///
/// Outcomes are mapped onto the stream as follows:
/// - `Ok(())` closes the stream normally.
/// - `Err(StreamError::StreamClosed)` means the consumer closed the stream;
///   the generator stops quietly.
/// - Any other error is recorded as the stream's terminal error.
/// - A panic or an aborted task records `StreamError::ProducerAborted`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_generator<F, Fut>(name: &'static str, writer: StreamWriter, produce: F) -> JoinHandle<()>
where
    F: FnOnce(StreamWriter) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let guard = CloseGuard::new(name, writer.handle());
        tracing::debug!(generator = name, "Generator started");

        let outcome = produce(writer).await;
        guard.finish(outcome);
    })
}

/// Closes the stream if the generator never reports an outcome.
struct CloseGuard {
    name: &'static str,
    writer: Option<StreamWriter>,
}

impl CloseGuard {
    fn new(name: &'static str, writer: StreamWriter) -> Self {
        Self {
            name,
            writer: Some(writer),
        }
    }

    fn finish(mut self, outcome: Result<()>) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let name = self.name;

        match outcome {
            Ok(()) => {
                if writer.close().is_err() {
                    tracing::debug!(generator = name, "Stream closed before generator finished");
                }
                tracing::debug!(generator = name, "Generator finished");
            }
            Err(StreamError::StreamClosed) => {
                tracing::debug!(generator = name, "Consumer closed stream, generator stopped");
            }
            Err(error) => {
                tracing::warn!(generator = name, %error, "Generator failed, recording terminal error");
                if writer.fail(error).is_err() {
                    tracing::debug!(generator = name, "Stream already closed, terminal error dropped");
                }
            }
        }
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            tracing::warn!(generator = self.name, "Generator stopped before finishing");
            let _ = writer.fail(StreamError::ProducerAborted {
                reason: format!("{} stopped before finishing", self.name),
            });
        }
    }
}
