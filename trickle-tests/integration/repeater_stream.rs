//! Integration tests for header/body repeater streams.

use std::time::{Duration, Instant};

use trickle_core::StreamError;
use trickle_sim::{RepeaterStreamBuilder, repeater_stream};
use trickle_tests::drain_polling;

#[tokio::test]
async fn test_repeater_yields_header_before_body() {
    let started = Instant::now();
    let reader = repeater_stream(b'H', 3, b'B', 2, Duration::from_millis(100));

    let (bytes, end) = drain_polling(&reader, 2).await;

    assert_eq!(bytes.len(), 5);
    assert_eq!(bytes.iter().filter(|b| **b == b'H').count(), 3);
    assert_eq!(bytes.iter().filter(|b| **b == b'B').count(), 2);
    assert_eq!(bytes, b"HHHBB");
    assert_eq!(end, StreamError::EndOfStream);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_repeater_body_only_and_header_only() {
    let body_only = repeater_stream(b'H', 0, b'B', 4, Duration::ZERO);
    let (bytes, _) = drain_polling(&body_only, 8).await;
    assert_eq!(bytes, b"BBBB");

    let header_only = repeater_stream(b'H', 4, b'B', 0, Duration::ZERO);
    let (bytes, _) = drain_polling(&header_only, 8).await;
    assert_eq!(bytes, b"HHHH");
}

#[tokio::test]
async fn test_seeded_repeater_chunks_reproducibly() {
    let build = || {
        RepeaterStreamBuilder::new(0x01, 40, 0x02, 60, Duration::ZERO)
            .seed(77)
            .build()
            .unwrap()
    };

    let first = build();
    let second = build();
    let (first_bytes, _) = drain_polling(&first, 7).await;
    let (second_bytes, _) = drain_polling(&second, 7).await;

    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first.stats().writes, second.stats().writes);
    assert_eq!(first_bytes[..40], [0x01; 40]);
    assert_eq!(first_bytes[40..], [0x02; 60]);
}
