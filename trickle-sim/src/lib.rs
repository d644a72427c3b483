//! Trickle Simulation - byte streams with realistic timing for tests.
//!
//! Each constructor creates a [`trickle_core::ClosableByteStream`], hands its
//! write half to a background generator and returns the read half. The
//! caller drains opportunistically while the generator writes and finally
//! closes, so code under test sees partial reads, delayed delivery and
//! half-closed streams without a real network or file.
//!
//! - [`random_stream`]: exact-size pseudorandom content, fixed or jittered chunks
//! - [`lag_stream`]: re-chunks and paces any [`tokio::io::AsyncRead`] source
//! - [`repeater_stream`]: header/body byte runs spread over a time budget
//!
//! Every variant moves through the same lifecycle: producing in the
//! background, draining once the generator closes the stream, exhausted
//! once a read finds it closed and empty.
//!
//! # Example
//!
//! ```rust
//! # #[tokio::main]
//! # async fn main() {
//! use std::time::Duration;
//!
//! use tokio::io::AsyncReadExt;
//! use trickle_sim::{lag_stream, random_stream};
//!
//! let mut paced = lag_stream(random_stream(32), Duration::from_millis(1));
//!
//! let mut out = Vec::new();
//! paced.read_to_end(&mut out).await.unwrap();
//! assert_eq!(out.len(), 32);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]

pub mod lag;
pub mod random;
pub mod repeater;

pub use lag::{LagStreamBuilder, lag_stream};
pub use random::{RandomStreamBuilder, random_stream};
pub use repeater::{RepeaterPattern, RepeaterStreamBuilder, repeater_stream};
