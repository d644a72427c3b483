//! Property tests for byte accounting across streams.

use proptest::prelude::*;
use trickle_core::{ClosableByteStream, StreamError};
use trickle_sim::RandomStreamBuilder;
use trickle_tests::{drain_closed, drain_polling};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_reads_return_exactly_what_was_written(
        writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..20),
        buf_size in 1usize..32,
    ) {
        let stream = ClosableByteStream::new();
        for bytes in &writes {
            prop_assert_eq!(stream.write(bytes), Ok(bytes.len()));
        }
        stream.close().unwrap();

        let (out, end) = drain_closed(&stream, buf_size);
        prop_assert_eq!(out, writes.concat());
        prop_assert_eq!(end, StreamError::EndOfStream);
    }

    #[test]
    fn prop_random_stream_size_is_exact(
        size in 0usize..2048,
        chunk_min in 1usize..16,
        chunk_max in 1usize..16,
        seed in any::<u64>(),
    ) {
        let (bytes, end) = block_on(async {
            let reader = RandomStreamBuilder::new(size)
                .chunk_min(chunk_min)
                .chunk_max(chunk_max)
                .seed(seed)
                .build()
                .unwrap();
            drain_polling(&reader, 37).await
        });

        prop_assert_eq!(bytes.len(), size);
        prop_assert_eq!(end, StreamError::EndOfStream);
    }

    #[test]
    fn prop_fixed_chunks_at_exact_multiples(
        chunk in 1usize..16,
        multiple in 0usize..32,
        extra in 0usize..16,
    ) {
        let size = chunk * multiple + extra % chunk;
        let (bytes, writes) = block_on(async {
            let reader = RandomStreamBuilder::new(size)
                .chunk_min(chunk)
                .chunk_max(chunk)
                .build()
                .unwrap();
            let (bytes, _) = drain_polling(&reader, 64).await;
            (bytes, reader.stats().writes)
        });

        prop_assert_eq!(bytes.len(), size);
        let expected_writes = multiple + usize::from(extra % chunk > 0);
        prop_assert_eq!(writes as usize, expected_writes);
    }
}
