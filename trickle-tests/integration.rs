//! Integration tests for Trickle
//!
//! These tests drive the stream variants the way code under test consumes
//! them: polling reads on a timer, awaiting reads through `AsyncRead`, and
//! concurrent producers and consumers on separate threads.

#[path = "integration/stream_semantics.rs"]
mod stream_semantics;

#[path = "integration/random_stream.rs"]
mod random_stream;

#[path = "integration/lag_stream.rs"]
mod lag_stream;

#[path = "integration/repeater_stream.rs"]
mod repeater_stream;

#[path = "integration/cancellation.rs"]
mod cancellation;

#[path = "integration/properties.rs"]
mod properties;
