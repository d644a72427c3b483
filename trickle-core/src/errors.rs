//! Error types shared by every stream and generator.

use std::io;

/// Errors surfaced by closable byte streams and the tasks that feed them.
///
/// `EndOfStream` is not a failure: it is the designed signal that no more
/// bytes will ever arrive. `Upstream` and `ProducerAborted` are terminal
/// errors recorded on a stream by its producer and handed to the reader
/// once the buffered bytes are drained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Stream construction options were rejected before any task started.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Why the configuration was rejected
        reason: String,
    },

    /// A write was attempted after the stream was closed for writing.
    #[error("cannot write to a closed stream")]
    StreamClosed,

    /// The stream was closed more than once.
    #[error("stream already closed")]
    AlreadyClosed,

    /// The stream is closed and fully drained.
    #[error("end of stream")]
    EndOfStream,

    /// The caller passed an argument the stream cannot work with.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the rejected argument
        reason: String,
    },

    /// The source feeding a producer failed with something other than end of stream.
    #[error("upstream read failed: {reason}")]
    Upstream {
        /// Error reported by the upstream source
        reason: String,
    },

    /// The producing task panicked before finishing.
    #[error("producer aborted: {reason}")]
    ProducerAborted {
        /// Name of the producer and what happened to it
        reason: String,
    },
}

impl StreamError {
    /// Checks if this is the regular end-of-stream signal.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, StreamError::EndOfStream)
    }

    /// Checks if this error can be recorded as a stream's terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamError::Upstream { .. } | StreamError::ProducerAborted { .. }
        )
    }
}

impl From<StreamError> for io::Error {
    fn from(error: StreamError) -> Self {
        match error {
            StreamError::EndOfStream => io::Error::new(io::ErrorKind::UnexpectedEof, error),
            StreamError::InvalidArgument { .. } | StreamError::InvalidConfiguration { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, error)
            }
            StreamError::StreamClosed | StreamError::AlreadyClosed => {
                io::Error::new(io::ErrorKind::BrokenPipe, error)
            }
            StreamError::Upstream { .. } | StreamError::ProducerAborted { .. } => {
                io::Error::other(error)
            }
        }
    }
}

/// Result alias for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(StreamError::EndOfStream.is_end_of_stream());
        assert!(!StreamError::EndOfStream.is_terminal());
        assert!(
            StreamError::Upstream {
                reason: "reset".to_string()
            }
            .is_terminal()
        );
        assert!(!StreamError::StreamClosed.is_terminal());
    }

    #[test]
    fn test_io_error_kinds() {
        let eof: io::Error = StreamError::EndOfStream.into();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);

        let upstream: io::Error = StreamError::Upstream {
            reason: "connection reset".to_string(),
        }
        .into();
        assert_eq!(upstream.kind(), io::ErrorKind::Other);
        assert!(upstream.to_string().contains("connection reset"));
    }
}
