//! Integration tests for exact-size random streams.

use trickle_core::{StreamError, StreamState, TrickleConfig};
use trickle_sim::{RandomStreamBuilder, random_stream};
use trickle_tests::drain_polling;

#[test]
fn test_zero_size_reports_end_of_stream_immediately() {
    let reader = random_stream(0);
    let mut buf = [0u8; 16];

    assert_eq!(reader.read(&mut buf), Err(StreamError::EndOfStream));
    assert_eq!(reader.state(), StreamState::Exhausted);
}

#[tokio::test]
async fn test_random_stream_yields_exact_size() {
    for size in [1usize, 7, 8, 42, 256, 1024] {
        let reader = random_stream(size);
        let (bytes, end) = drain_polling(&reader, 5).await;

        assert_eq!(bytes.len(), size, "created a random stream of size {size}");
        assert_eq!(end, StreamError::EndOfStream);
        assert_eq!(reader.stats().bytes_written, size as u64);
    }
}

#[tokio::test]
async fn test_jittered_random_stream_yields_exact_size() -> anyhow::Result<()> {
    let config = TrickleConfig::for_testing();

    for size in [1usize, 7, 8, 42, 256, 1024] {
        let reader = RandomStreamBuilder::new(size)
            .config(&config)
            .chunk_min(3)
            .chunk_max(17)
            .build()?;
        let (bytes, end) = drain_polling(&reader, 64).await;

        assert_eq!(bytes.len(), size);
        assert!(end.is_end_of_stream());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_polling_reader_collects_everything_on_parallel_runtime() {
    let reader = RandomStreamBuilder::new(4096).seed(1).build().unwrap();
    let mut buf = [0u8; 4096];
    let mut reads = 0;
    let mut total = 0;

    loop {
        match reader.read(&mut buf) {
            Ok(0) => tokio::task::yield_now().await,
            Ok(count) => {
                reads += 1;
                total += count;
            }
            Err(StreamError::EndOfStream) => break,
            Err(error) => panic!("unexpected error: {error}"),
        }
    }

    assert_eq!(total, 4096);
    assert!(reads >= 1);
}

#[test]
fn test_invalid_chunk_options_rejected() {
    let result = RandomStreamBuilder::new(64).chunk_min(4).chunk_max(0).build();

    match result {
        Err(StreamError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("at least 1"));
        }
        other => panic!("Expected InvalidConfiguration, got {other:?}"),
    }
}
