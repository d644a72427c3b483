//! Integration tests for paced lag streams.

use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tracing::Level;
use trickle_core::tracing_setup::init_test_tracing;
use trickle_core::{ClosableByteStream, StreamError, TrickleConfig};
use trickle_sim::{LagStreamBuilder, lag_stream, random_stream};
use trickle_tests::{CountingSource, drain_polling};

#[tokio::test]
async fn test_lag_stream_delivers_hello_world_in_order() {
    init_test_tracing(Level::DEBUG);
    let tick = Duration::from_millis(5);
    let started = Instant::now();
    let reader = lag_stream(&b"hello world"[..], tick);

    let (bytes, end) = drain_polling(&reader, 4).await;
    let chunks = reader.stats().writes as u32;

    assert_eq!(bytes, b"hello world");
    assert_eq!(end, StreamError::EndOfStream);
    assert!((3..=4).contains(&chunks), "11 bytes in 3-5 byte pulls");
    assert!(
        started.elapsed() >= tick * chunks,
        "drained {chunks} chunks in {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_lag_stream_over_trickle_source() {
    let config = TrickleConfig::for_testing();
    let mut reader = LagStreamBuilder::new(random_stream(100), config.lag.tick_delay)
        .config(&config)
        .build()
        .unwrap();

    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.unwrap();
    assert_eq!(out.len(), 100);
}

#[tokio::test]
async fn test_upstream_terminal_error_reaches_reader() {
    let (writer, source) = ClosableByteStream::new().split();
    writer.write(b"abcdef").unwrap();
    let failure = StreamError::Upstream {
        reason: "disk went away".to_string(),
    };
    writer.fail(failure.clone()).unwrap();

    let reader = lag_stream(source, Duration::from_millis(1));
    let (bytes, end) = drain_polling(&reader, 16).await;

    assert_eq!(bytes, b"abcdef");
    assert_eq!(end, failure);
    assert_eq!(reader.terminal_error(), Some(failure));
}

#[tokio::test]
async fn test_small_queue_still_delivers_everything() {
    let payload: Vec<u8> = (0..=255).collect();
    let reader = LagStreamBuilder::new(std::io::Cursor::new(payload.clone()), Duration::ZERO)
        .queue_capacity(1)
        .pull_range(1, 2)
        .seed(8)
        .build()
        .unwrap();

    let (bytes, end) = drain_polling(&reader, 32).await;
    assert_eq!(bytes, payload);
    assert!(end.is_end_of_stream());
}

#[tokio::test]
async fn test_full_queue_blocks_puller() {
    let source = CountingSource::new(b'z');
    let capacity = TrickleConfig::default().lag.queue_capacity;
    let reader = lag_stream(source.clone(), Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let reads = source.reads();

    // Queued chunks, the one being paced, and the one waiting to be sent
    assert!(
        (capacity..=capacity + 2).contains(&reads),
        "{reads} reads against a queue of {capacity}"
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.reads(), reads, "puller kept reading while blocked");
    assert_eq!(reader.stats().writes, 1);
    reader.close().unwrap();
}

#[tokio::test]
async fn test_configured_queue_capacity_bounds_reads() {
    let source = CountingSource::new(b'q');
    let reader = LagStreamBuilder::new(source.clone(), Duration::from_secs(1))
        .queue_capacity(2)
        .seed(6)
        .build()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(source.reads() <= 4, "{} reads", source.reads());
    reader.close().unwrap();
}

#[tokio::test]
async fn test_builder_from_config_uses_configured_tick() {
    let mut config = TrickleConfig::for_testing();
    config.lag.tick_delay = Duration::from_millis(4);
    let started = Instant::now();
    let mut reader = LagStreamBuilder::from_config(&b"0123456789"[..], &config)
        .build()
        .unwrap();

    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.unwrap();
    let chunks = reader.stats().writes as u32;

    assert_eq!(out, b"0123456789");
    assert!(started.elapsed() >= config.lag.tick_delay * chunks);
}
