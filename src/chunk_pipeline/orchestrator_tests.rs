use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::*;
use crate::bridge::{self, FRAME_HEADER_LEN};
use crate::config::{Capacity, Direction, PipelineConfig};
use crate::error::PzipError;
use crate::kernels;

//==================================================================================
// Test Helpers
//==================================================================================

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// Mostly-repeating text so compressed frames are much smaller than chunks.
fn text_bytes(len: usize) -> Vec<u8> {
    let pattern = b"pipeline stage 0123456789 abcdefghij ";
    pattern.iter().cycle().take(len).copied().collect()
}

fn config(chunk_size: usize, workers: usize, ca: usize, cb: usize) -> PipelineConfig {
    PipelineConfig::default()
        .with_chunk_size(chunk_size)
        .with_worker_count(workers)
        .with_input_capacity(Capacity::Bounded(ca))
        .with_output_capacity(Capacity::Bounded(cb))
}

fn roundtrip(data: &[u8], config: &PipelineConfig) -> Vec<u8> {
    let mut archive = Vec::new();
    bridge::compress(Cursor::new(data), &mut archive, config).unwrap();
    let mut restored = Vec::new();
    bridge::decompress(Cursor::new(&archive), &mut restored, config).unwrap();
    restored
}

/// The archive a single-threaded compressor would produce.
fn sequential_archive(data: &[u8], chunk_size: usize, level: i32) -> Vec<u8> {
    let mut archive = Vec::new();
    for piece in data.chunks(chunk_size) {
        let frame = kernels::zstd::encode(piece, level).unwrap();
        archive.extend_from_slice(&(frame.len() as i32).to_le_bytes());
        archive.extend_from_slice(&frame);
    }
    archive
}

/// Sleeps longer for earlier chunks, so workers finish in reverse index order.
struct ReverseDelayCodec {
    inner: Box<dyn Codec>,
    total: u64,
}

impl Codec for ReverseDelayCodec {
    fn direction(&self) -> Direction {
        self.inner.direction()
    }

    fn try_read_next(
        &self,
        input: &mut dyn Read,
        pool: &Arc<BufferPool>,
    ) -> crate::Result<Option<PooledBuffer>> {
        self.inner.try_read_next(input, pool)
    }

    fn transform(&self, chunk: &Chunk, pool: &Arc<BufferPool>) -> crate::Result<Chunk> {
        let wait = self.total.saturating_sub(chunk.index()) * 3;
        thread::sleep(Duration::from_millis(wait));
        self.inner.transform(chunk, pool)
    }

    fn write_header(&self, chunk: &Chunk, output: &mut dyn Write) -> crate::Result<()> {
        self.inner.write_header(chunk, output)
    }
}

/// Counts chunks handed to the splitter and misbehaves on demand.
struct InstrumentedCodec {
    inner: Box<dyn Codec>,
    reads: Arc<AtomicU64>,
    fail_at: Option<u64>,
    panic_at: Option<u64>,
}

impl InstrumentedCodec {
    fn new(inner: Box<dyn Codec>) -> Self {
        Self {
            inner,
            reads: Arc::new(AtomicU64::new(0)),
            fail_at: None,
            panic_at: None,
        }
    }
}

impl Codec for InstrumentedCodec {
    fn direction(&self) -> Direction {
        self.inner.direction()
    }

    fn try_read_next(
        &self,
        input: &mut dyn Read,
        pool: &Arc<BufferPool>,
    ) -> crate::Result<Option<PooledBuffer>> {
        let next = self.inner.try_read_next(input, pool)?;
        if next.is_some() {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
        Ok(next)
    }

    fn transform(&self, chunk: &Chunk, pool: &Arc<BufferPool>) -> crate::Result<Chunk> {
        if self.fail_at == Some(chunk.index()) {
            return Err(PzipError::Codec(format!("refusing chunk {}", chunk.index())));
        }
        if self.panic_at == Some(chunk.index()) {
            panic!("worker blew up on chunk {}", chunk.index());
        }
        self.inner.transform(chunk, pool)
    }

    fn write_header(&self, chunk: &Chunk, output: &mut dyn Write) -> crate::Result<()> {
        self.inner.write_header(chunk, output)
    }
}

/// A sink whose writes block until the gate is opened.
#[derive(Clone)]
struct GatedSink {
    open: Arc<(Mutex<bool>, Condvar)>,
    data: Arc<Mutex<Vec<u8>>>,
}

impl GatedSink {
    fn new() -> Self {
        Self {
            open: Arc::new((Mutex::new(false), Condvar::new())),
            data: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn release(&self) {
        let (lock, cvar) = &*self.open;
        *lock.lock() = true;
        cvar.notify_all();
    }
}

impl Write for GatedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (lock, cvar) = &*self.open;
        let mut open = lock.lock();
        while !*open {
            cvar.wait(&mut open);
        }
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Accepts `budget` bytes, then fails every write.
struct FailingSink {
    budget: usize,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts how many `read` calls reach the input.
struct CountingReader<R> {
    inner: R,
    calls: Arc<AtomicUsize>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.read(buf)
    }
}

fn expect_operation_failed(err: &PzipError, verb: &str) {
    match err {
        PzipError::OperationFailed { operation, .. } => assert_eq!(*operation, verb),
        other => panic!("expected OperationFailed, got {:?}", other),
    }
}

//==================================================================================
// Round Trips
//==================================================================================

#[test]
fn test_roundtrip_empty_input() {
    let config = config(64, 2, 2, 2);
    let mut archive = Vec::new();
    let report = bridge::compress(Cursor::new(Vec::new()), &mut archive, &config).unwrap();

    assert!(archive.is_empty());
    assert_eq!(report.chunks_read, 0);
    assert_eq!(report.chunks_written, 0);
    assert!(roundtrip(&[], &config).is_empty());
}

#[test]
fn test_roundtrip_single_byte() {
    let config = config(64, 2, 2, 2);
    assert_eq!(roundtrip(&[0x42], &config), vec![0x42]);
}

#[test]
fn test_exact_chunk_boundary_has_no_trailing_frame() {
    let data = text_bytes(3 * 128);
    let config = config(128, 3, 2, 2);

    let mut archive = Vec::new();
    let report = bridge::compress(Cursor::new(&data), &mut archive, &config).unwrap();
    assert_eq!(report.chunks_written, 3);
    assert_eq!(
        bridge::analyze_archive(Cursor::new(&archive)).unwrap().frame_count,
        3
    );
    assert_eq!(roundtrip(&data, &config), data);
}

#[test]
fn test_roundtrip_many_chunks_small_channels() {
    let data = random_bytes(200 * 97 + 13, 7);
    let config = config(97, 4, 1, 1);
    assert_eq!(roundtrip(&data, &config), data);
}

#[test]
fn test_roundtrip_unbounded_channels() {
    let data = text_bytes(50_000);
    let config = PipelineConfig::default()
        .with_chunk_size(1000)
        .with_worker_count(3)
        .with_input_capacity(Capacity::Unbounded)
        .with_output_capacity(Capacity::Unbounded);
    assert_eq!(roundtrip(&data, &config), data);
}

#[test]
fn test_single_worker_matches_many_workers() {
    let data = text_bytes(30_000);
    let one = sequential_archive(&data, 1000, config(1000, 1, 2, 2).zstd_level());

    let mut archive = Vec::new();
    bridge::compress(Cursor::new(&data), &mut archive, &config(1000, 6, 3, 3)).unwrap();
    assert_eq!(archive, one);
}

#[test]
fn test_zero_length_frame_decodes_to_nothing() {
    let mut archive = Vec::new();
    archive.extend_from_slice(&0i32.to_le_bytes());
    archive.extend_from_slice(&sequential_archive(b"tail", 64, 3));

    let mut restored = Vec::new();
    bridge::decompress(Cursor::new(&archive), &mut restored, &config(64, 2, 2, 2)).unwrap();
    assert_eq!(restored, b"tail");
}

//==================================================================================
// Ordering
//==================================================================================

#[test]
fn test_reverse_completion_still_writes_in_order() {
    const CHUNKS: u64 = 12;
    let chunk_size = 256;
    let data = text_bytes(CHUNKS as usize * chunk_size);
    let config = config(chunk_size, 4, 4, 4);

    let codec = ReverseDelayCodec {
        inner: codec_for(Direction::Compress, &config),
        total: CHUNKS,
    };
    let mut pipeline = Pipeline::with_codec(Box::new(codec), config.clone()).unwrap();

    let mut archive = Vec::new();
    let report = pipeline.run(Cursor::new(&data), &mut archive).unwrap();

    assert_eq!(report.chunks_written, CHUNKS);
    assert_eq!(archive, sequential_archive(&data, chunk_size, config.zstd_level()));
}

//==================================================================================
// Backpressure
//==================================================================================

#[test]
fn test_blocked_writer_bounds_chunks_in_flight() {
    let (ca, cb, workers) = (2usize, 2usize, 1usize);
    let data = text_bytes(64 * 200);
    let config = config(64, workers, ca, cb);

    let instrumented = InstrumentedCodec::new(codec_for(Direction::Compress, &config));
    let reads = Arc::clone(&instrumented.reads);
    let sink = GatedSink::new();

    thread::scope(|s| {
        let output = sink.clone();
        let runner = s.spawn(|| {
            let mut pipeline = Pipeline::with_codec(Box::new(instrumented), config.clone()).unwrap();
            pipeline.run(Cursor::new(&data), output)
        });

        thread::sleep(Duration::from_millis(300));
        let in_flight = reads.load(Ordering::SeqCst);
        assert!(
            in_flight <= (ca + cb + workers + 2) as u64,
            "splitter read {} chunks while the writer was blocked",
            in_flight
        );

        sink.release();
        let report = runner.join().unwrap().unwrap();
        assert_eq!(report.chunks_read, 200);
    });

    let archive = sink.data.lock().clone();
    let mut restored = Vec::new();
    bridge::decompress(Cursor::new(&archive), &mut restored, &config).unwrap();
    assert_eq!(restored, data);
}

//==================================================================================
// Corrupted Archives
//==================================================================================

fn valid_archive() -> (Vec<u8>, PipelineConfig) {
    let config = config(512, 2, 2, 2);
    let mut archive = Vec::new();
    bridge::compress(Cursor::new(text_bytes(4000)), &mut archive, &config).unwrap();
    (archive, config)
}

#[test]
fn test_truncated_payload_is_format_error() {
    let (archive, config) = valid_archive();
    let cut = &archive[..archive.len() - 5];

    let err = bridge::decompress(Cursor::new(cut), Vec::new(), &config).unwrap_err();
    expect_operation_failed(&err, "decompress");
    assert!(err.is_format_error(), "unexpected error: {}", err);
}

#[test]
fn test_truncation_inside_early_frame_is_format_error() {
    let (archive, config) = valid_archive();
    assert_eq!(bridge::analyze_archive(Cursor::new(&archive)).unwrap().frame_count, 8);

    // Cut a few bytes into frame 1 of 8 while frame 0 is still being decoded.
    let first_len = i32::from_le_bytes(archive[..FRAME_HEADER_LEN].try_into().unwrap()) as usize;
    let cut_at = FRAME_HEADER_LEN + first_len + FRAME_HEADER_LEN + 2;
    let cut = &archive[..cut_at];

    let err = bridge::decompress(Cursor::new(cut), Vec::new(), &config).unwrap_err();
    expect_operation_failed(&err, "decompress");
    assert!(err.is_format_error(), "unexpected error: {}", err);
}

#[test]
fn test_trailing_partial_prefix_is_format_error() {
    let (mut archive, config) = valid_archive();
    archive.extend_from_slice(&[0x10, 0x00]);

    let err = bridge::decompress(Cursor::new(&archive), Vec::new(), &config).unwrap_err();
    assert!(err.is_format_error(), "unexpected error: {}", err);
}

#[test]
fn test_negative_frame_length_is_format_error() {
    let (mut archive, config) = valid_archive();
    archive.extend_from_slice(&(-1i32).to_le_bytes());

    let err = bridge::decompress(Cursor::new(&archive), Vec::new(), &config).unwrap_err();
    assert!(err.is_format_error(), "unexpected error: {}", err);
}

//==================================================================================
// Realistic Workload
//==================================================================================

#[test]
fn test_ten_mebibytes_random_roundtrip() {
    const MIB: usize = 1024 * 1024;
    let data = random_bytes(10 * MIB, 2024);
    let original_digest = md5::compute(&data);

    let compress_config = config(MIB, 4, 5, 5);
    let mut archive = Vec::new();
    let report = bridge::compress(Cursor::new(&data), &mut archive, &compress_config).unwrap();
    assert_eq!(report.chunks_written, 10);
    assert_eq!(report.bytes_read, (10 * MIB) as u64);

    let stats = bridge::analyze_archive(Cursor::new(&archive)).unwrap();
    assert_eq!(stats.frame_count, 10);
    assert_eq!(
        stats.total_bytes,
        stats.payload_bytes + 10 * FRAME_HEADER_LEN as u64
    );

    let decompress_config = config(MIB, 8, 5, 5);
    let mut restored = Vec::with_capacity(data.len());
    bridge::decompress(Cursor::new(&archive), &mut restored, &decompress_config).unwrap();
    assert_eq!(md5::compute(&restored), original_digest);
}

//==================================================================================
// Failure Handling
//==================================================================================

#[test]
fn test_worker_error_fails_the_run() {
    let config = config(100, 3, 2, 2);
    let mut instrumented = InstrumentedCodec::new(codec_for(Direction::Compress, &config));
    instrumented.fail_at = Some(3);

    let mut pipeline = Pipeline::with_codec(Box::new(instrumented), config).unwrap();
    let err = pipeline
        .run(Cursor::new(text_bytes(100 * 50)), Vec::new())
        .unwrap_err();

    expect_operation_failed(&err, "compress");
    assert!(matches!(err.root_cause(), PzipError::Codec(_)));
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[test]
fn test_writer_io_error_fails_the_run() {
    let config = config(100, 2, 2, 2);
    let sink = FailingSink { budget: 150 };

    let err = bridge::compress(Cursor::new(random_bytes(100 * 40, 3)), sink, &config).unwrap_err();
    expect_operation_failed(&err, "compress");
    assert!(matches!(err.root_cause(), PzipError::Io(_)));
}

#[test]
fn test_worker_panic_is_reported_not_propagated() {
    let config = config(100, 2, 2, 2);
    let mut instrumented = InstrumentedCodec::new(codec_for(Direction::Compress, &config));
    instrumented.panic_at = Some(1);

    let mut pipeline = Pipeline::with_codec(Box::new(instrumented), config).unwrap();
    let err = pipeline
        .run(Cursor::new(text_bytes(100 * 20)), Vec::new())
        .unwrap_err();

    expect_operation_failed(&err, "compress");
    match err.root_cause() {
        PzipError::Internal(message) => assert!(message.contains("panicked"), "{}", message),
        other => panic!("expected Internal, got {:?}", other),
    }
}

#[test]
fn test_input_read_error_fails_the_run() {
    struct BrokenReader;
    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"))
        }
    }

    let err = bridge::compress(BrokenReader, Vec::new(), &config(64, 2, 2, 2)).unwrap_err();
    assert!(matches!(err.root_cause(), PzipError::Io(_)));
}

//==================================================================================
// Lifecycle
//==================================================================================

#[test]
fn test_pipeline_runs_at_most_once() {
    let mut pipeline = Pipeline::new(Direction::Compress, config(64, 2, 2, 2)).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Idle);

    pipeline.run(Cursor::new(b"first".to_vec()), Vec::new()).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Completed);

    let err = pipeline
        .run(Cursor::new(b"second".to_vec()), Vec::new())
        .unwrap_err();
    assert!(matches!(err, PzipError::Internal(_)));
    assert_eq!(pipeline.state(), PipelineState::Completed);
}

#[test]
fn test_invalid_config_fails_before_reading() {
    let calls = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        inner: Cursor::new(b"never read".to_vec()),
        calls: Arc::clone(&calls),
    };

    let bad = PipelineConfig::default().with_worker_count(0);
    let err = bridge::compress(reader, Vec::new(), &bad).unwrap_err();

    assert!(matches!(err, PzipError::Configuration(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_huge_channel_bounds_run_without_preallocating() {
    let data = text_bytes(20_000);
    let config = PipelineConfig::default()
        .with_chunk_size(1000)
        .with_worker_count(2)
        .with_input_capacity(Capacity::Bounded(usize::MAX / 2))
        .with_output_capacity(Capacity::Bounded(usize::MAX));
    assert_eq!(roundtrip(&data, &config), data);
}

#[test]
fn test_huge_worker_count_is_a_configuration_error() {
    let config = PipelineConfig::default().with_worker_count(usize::MAX);
    let err = bridge::compress(Cursor::new(text_bytes(100)), Vec::new(), &config).unwrap_err();
    assert!(matches!(err, PzipError::Configuration(_)));
}

#[test]
fn test_report_describes_the_run() {
    let data = text_bytes(5000);
    let mut pipeline = Pipeline::new(Direction::Compress, config(1000, 2, 2, 2)).unwrap();
    let mut archive = Vec::new();
    let report = pipeline.run(Cursor::new(&data), &mut archive).unwrap();

    assert_eq!(report.direction, Direction::Compress);
    assert_eq!(report.workers, 2);
    assert_eq!(report.chunks_read, 5);
    assert_eq!(report.chunks_written, 5);
    assert_eq!(report.bytes_read, 5000);
    assert_eq!(report.bytes_written, archive.len() as u64);
}
