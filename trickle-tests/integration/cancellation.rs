//! Integration tests for consumer-side cancellation.

use std::time::Duration;

use trickle_core::{StreamError, StreamState};
use trickle_sim::{lag_stream, repeater_stream};

#[tokio::test]
async fn test_closing_reader_stops_repeater() {
    let reader = repeater_stream(b'H', 500, b'B', 500, Duration::from_secs(10));
    tokio::time::sleep(Duration::from_millis(50)).await;

    reader.close().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let written = reader.stats().bytes_written;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(reader.stats().bytes_written, written);
    assert!(written < 1000);
    assert_eq!(reader.terminal_error(), None);
}

#[tokio::test]
async fn test_closing_reader_stops_lag_over_endless_source() {
    let reader = lag_stream(tokio::io::repeat(b'x'), Duration::from_millis(2));
    tokio::time::sleep(Duration::from_millis(30)).await;

    reader.close().unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let written = reader.stats().bytes_written;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reader.stats().bytes_written, written);

    // Bytes written before the close still drain.
    let mut buf = vec![0u8; 4096];
    let mut drained = 0;
    loop {
        match reader.read(&mut buf) {
            Ok(count) => drained += count,
            Err(StreamError::EndOfStream) => break,
            Err(error) => panic!("unexpected error: {error}"),
        }
    }
    assert_eq!(drained as u64, written);
    assert_eq!(reader.state(), StreamState::Exhausted);
}
