//! Integration tests for closable byte stream semantics.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use trickle_core::{ClosableByteStream, StreamError, StreamState};
use trickle_tests::drain_closed;

#[test]
fn test_total_read_matches_total_written_for_any_buffer() {
    let writes: [&[u8]; 4] = [b"alpha", b"", b"beta gamma", b"d"];
    let written: usize = writes.iter().map(|w| w.len()).sum();

    for buf_size in [1, 2, 3, 7, 16, 64] {
        let stream = ClosableByteStream::new();
        for bytes in writes {
            stream.write(bytes).unwrap();
        }
        stream.close().unwrap();

        let (out, end) = drain_closed(&stream, buf_size);
        assert_eq!(out.len(), written, "buffer size {buf_size}");
        assert_eq!(out, b"alphabeta gammad");
        assert_eq!(end, StreamError::EndOfStream);
    }
}

#[test]
fn test_close_twice() {
    let stream = ClosableByteStream::new();
    assert_eq!(stream.close(), Ok(()));
    assert_eq!(stream.close(), Err(StreamError::AlreadyClosed));
}

#[test]
fn test_half_closed_stream_still_drains() {
    let (writer, reader) = ClosableByteStream::new().split();
    writer.write(b"buffered").unwrap();
    writer.close().unwrap();

    assert_eq!(writer.write(b"more"), Err(StreamError::StreamClosed));
    assert_eq!(reader.pending_len(), 8);
    assert_eq!(reader.state(), StreamState::ClosedDraining);

    let mut buf = [0u8; 5];
    assert_eq!(reader.read(&mut buf), Ok(5));
    assert_eq!(&buf, b"buffe");
    assert_eq!(reader.read(&mut buf), Ok(3));
    assert_eq!(&buf[..3], b"red");
    assert_eq!(reader.read(&mut buf), Err(StreamError::EndOfStream));
    assert_eq!(reader.state(), StreamState::Exhausted);
}

#[test]
fn test_concurrent_writer_and_reader_agree() {
    let stream = Arc::new(ClosableByteStream::new());

    let writer_stream = Arc::clone(&stream);
    let writer = thread::spawn(move || {
        let started = Instant::now();
        let mut written = 0usize;

        while started.elapsed() < Duration::from_millis(300) {
            written += writer_stream.write(b"a").unwrap();
            thread::sleep(Duration::from_millis(1));
            written += writer_stream.write(b"b").unwrap();
            thread::sleep(Duration::from_millis(1));
            written += writer_stream.write(b"c").unwrap();
        }

        writer_stream.close().unwrap();
        written
    });

    let reader_stream = Arc::clone(&stream);
    let reader = thread::spawn(move || {
        let mut buf = [0u8; 3];
        let mut read = 0usize;

        loop {
            match reader_stream.read(&mut buf) {
                Ok(0) => thread::sleep(Duration::from_micros(200)),
                Ok(count) => {
                    read += count;
                    thread::sleep(Duration::from_millis(1));
                }
                Err(StreamError::EndOfStream) => break,
                Err(error) => panic!("Received non end-of-stream error while reading: {error}"),
            }
        }
        read
    });

    let written = writer.join().unwrap();
    let read = reader.join().unwrap();

    assert!(written > 0);
    assert_eq!(read, written, "wrote {written} but read {read}");

    let stats = stream.stats();
    assert_eq!(stats.bytes_written, written as u64);
    assert_eq!(stats.bytes_read, read as u64);
}
