//! Trickle Core - closable byte streams for test doubles
//!
//! This crate provides the building blocks for byte-stream test doubles:
//! a synchronized in-memory stream with half-close semantics, chunk sizing
//! policies, an injectable random source, and the generator task that
//! drives a stream from the background while a caller drains it.
//!
//! # Example
//!
//! ```rust
//! # #[tokio::main]
//! # async fn main() {
//! use tokio::io::AsyncReadExt;
//! use trickle_core::{ClosableByteStream, spawn_generator};
//!
//! let (writer, mut reader) = ClosableByteStream::new().split();
//! spawn_generator("greeting", writer, |writer| async move {
//!     writer.write(b"hello")?;
//!     Ok(())
//! });
//!
//! let mut out = Vec::new();
//! reader.read_to_end(&mut out).await.unwrap();
//! assert_eq!(out, b"hello");
//! # }
//! ```

pub mod chunk_policy;
pub mod config;
pub mod errors;
pub mod generator;
pub mod rng;
pub mod stream;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use chunk_policy::ChunkPolicy;
pub use config::TrickleConfig;
pub use errors::{Result, StreamError};
pub use generator::spawn_generator;
pub use rng::DeterministicRng;
pub use stream::{ClosableByteStream, StreamReader, StreamState, StreamStats, StreamWriter};
