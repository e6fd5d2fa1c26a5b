//! Behavioral tests for the buffered writer.
//!
//! Timer scenarios run on a paused tokio clock, so ticks and sleeps are
//! deterministic and the tests do not take wall-clock time.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{Admission, BufferedWriter, Config, Error, Sink};

// ============================================================================
// Test sinks
// ============================================================================

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().clone()
    }

    fn total_bytes(&self) -> usize {
        self.calls.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.calls.lock().push(buf.to_vec());
        Ok(buf.len())
    }
}

struct FailingSink;

#[async_trait]
impl Sink for FailingSink {
    async fn write(&self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
    }
}

struct ShortSink;

#[async_trait]
impl Sink for ShortSink {
    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len().saturating_sub(1))
    }
}

struct StalledSink;

#[async_trait]
impl Sink for StalledSink {
    async fn write(&self, _buf: &[u8]) -> io::Result<usize> {
        std::future::pending().await
    }
}

/// Records calls after a delay and tracks how many calls overlap.
#[derive(Default)]
struct SlowSink {
    inner: RecordingSink,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl Sink for SlowSink {
    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.write(buf).await
    }
}

/// Lets spawned drains run to completion on a current-thread runtime.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn queued(queue_size: usize) -> Config {
    Config::new().with_queue_size(queue_size)
}

/// Shows writer logs with `RUST_LOG=tickio_buffered=trace cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    /// Ten small writes that exactly fit one buffer reach the sink as a
    /// single block at close.
    #[tokio::test]
    async fn test_small_writes_coalesce_into_one_block() {
        let sink = Arc::new(RecordingSink::default());
        let config = Config::new().with_buffer_size(1024).with_pool_size(2);
        let writer = BufferedWriter::new(Arc::clone(&sink), config).unwrap();

        let payload = vec![b'x'; 102];
        for _ in 0..10 {
            assert_eq!(writer.write(&payload).unwrap(), 102);
        }
        settle().await;
        assert!(sink.calls().is_empty());

        writer.close().await.unwrap();
        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 1020);
    }

    async fn run_timer_scenario(config: Config) {
        let sink = Arc::new(RecordingSink::default());
        let config = config
            .with_buffer_size(1021)
            .with_pool_size(2)
            .with_flush_interval(Duration::from_millis(200));
        let writer = BufferedWriter::new(Arc::clone(&sink), config).unwrap();

        // Offset writes from the ticks so every tick finds exactly one write.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let payload = vec![b'y'; 102];
        for _ in 0..10 {
            assert_eq!(writer.write(&payload).unwrap(), 102);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        writer.close().await.unwrap();

        let calls = sink.calls();
        assert_eq!(calls.len(), 10);
        assert!(calls.iter().all(|c| c.len() == 102));
        assert_eq!(sink.total_bytes(), 1020);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_each_write_locked() {
        run_timer_scenario(Config::new()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_each_write_queued() {
        run_timer_scenario(queued(1)).await;
    }

    /// With a queue of one, a second write issued before the listener runs
    /// is dropped rather than blocking.
    #[tokio::test]
    async fn test_full_queue_drops_write() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), queued(1)).unwrap();

        assert_eq!(writer.write(b"first").unwrap(), 5);
        assert!(matches!(writer.write(b"second"), Err(Error::Dropped)));
        assert_eq!(writer.stats().dropped_writes, 1);

        writer.close().await.unwrap();
        assert_eq!(sink.calls(), vec![b"first".to_vec()]);
    }
}

// ============================================================================
// Routing and delivery properties
// ============================================================================

mod routing {
    use super::*;

    async fn run_oversized(config: Config) {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), config.with_buffer_size(64)).unwrap();

        let exact = vec![b'e'; 64];
        let large = vec![b'l'; 150];
        writer.write(b"small").unwrap();
        assert_eq!(writer.write(&exact).unwrap(), 64);
        assert_eq!(writer.write(&large).unwrap(), 150);
        writer.close().await.unwrap();

        let calls = sink.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.contains(&exact));
        assert!(calls.contains(&large));
        assert!(calls.contains(&b"small".to_vec()));
        // Oversized payloads never take a buffer
        assert_eq!(writer.stats().buffer_allocs, 1);
    }

    #[tokio::test]
    async fn test_oversized_payload_is_one_direct_call_locked() {
        run_oversized(Config::new()).await;
    }

    #[tokio::test]
    async fn test_oversized_payload_is_one_direct_call_queued() {
        run_oversized(queued(8)).await;
    }

    fn record(producer: usize, seq: usize) -> Vec<u8> {
        let pad = "z".repeat((producer * 7 + seq * 3) % 40);
        format!("p{}-{}:{}\n", producer, seq, pad).into_bytes()
    }

    /// Every sink call carries whole payloads and nothing is lost.
    async fn run_concurrent_producers(config: Config) {
        const PRODUCERS: usize = 8;
        const RECORDS: usize = 200;

        let sink = Arc::new(RecordingSink::default());
        let writer = Arc::new(
            BufferedWriter::new(
                Arc::clone(&sink),
                config.with_buffer_size(256).with_pool_size(2),
            )
            .unwrap(),
        );

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let writer = Arc::clone(&writer);
                tokio::spawn(async move {
                    let mut accepted = 0;
                    for seq in 0..RECORDS {
                        accepted += writer.write(&record(p, seq)).unwrap();
                        if seq % 16 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let mut accepted = 0;
        for producer in producers {
            accepted += producer.await.unwrap();
        }
        writer.close().await.unwrap();

        assert_eq!(sink.total_bytes(), accepted);

        let mut expected: HashMap<Vec<u8>, usize> = HashMap::new();
        for p in 0..PRODUCERS {
            for seq in 0..RECORDS {
                *expected.entry(record(p, seq)).or_default() += 1;
            }
        }

        let mut seen: HashMap<Vec<u8>, usize> = HashMap::new();
        for call in sink.calls() {
            assert!(call.len() <= 256);
            assert_eq!(call.last(), Some(&b'\n'), "payload split across sink calls");
            for line in call.split_inclusive(|b| *b == b'\n') {
                *seen.entry(line.to_vec()).or_default() += 1;
            }
        }
        assert_eq!(seen, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_locked() {
        run_concurrent_producers(Config::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_queued() {
        // Queue large enough that nothing is dropped
        run_concurrent_producers(queued(8 * 200)).await;
    }

    #[tokio::test]
    async fn test_per_buffer_order_preserved() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), Config::new().with_buffer_size(32)).unwrap();
        for chunk in [&b"a1 "[..], b"b2 ", b"c3 ", b"d4"] {
            writer.write(chunk).unwrap();
        }
        writer.close().await.unwrap();
        assert_eq!(sink.calls(), vec![b"a1 b2 c3 d4".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_run_concurrently_without_blocking_writes() {
        let sink = Arc::new(SlowSink::default());
        let writer = BufferedWriter::new(
            Arc::clone(&sink),
            Config::new().with_buffer_size(10).with_pool_size(2),
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        for _ in 0..5 {
            // Each write overflows the previous one, one flush per write
            writer.write(b"123456").unwrap();
        }
        assert_eq!(tokio::time::Instant::now(), start);

        writer.close().await.unwrap();
        assert_eq!(sink.inner.calls().len(), 5);
        assert!(sink.max_in_flight.load(Ordering::SeqCst) >= 2);
        // The pool bounds idle buffers only: every pending drain held its own
        assert_eq!(writer.stats().buffer_allocs, 5);
        assert!(writer.pool().idle() <= 2);
    }

    /// With a sink that keeps up, producers reuse pooled buffers: no more
    /// than `pool_size` are ever allocated, oversized writes included.
    #[tokio::test]
    async fn test_pool_bounds_buffers_for_concurrent_producers() {
        const PRODUCERS: usize = 4;
        const ROUNDS: usize = 50;

        let sink = Arc::new(RecordingSink::default());
        let writer = Arc::new(
            BufferedWriter::new(
                Arc::clone(&sink),
                Config::new().with_buffer_size(64).with_pool_size(2),
            )
            .unwrap(),
        );

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let writer = Arc::clone(&writer);
                tokio::spawn(async move {
                    let mut oversized: usize = 0;
                    for round in 0..ROUNDS {
                        if (round + p) % 10 == 0 {
                            writer.write(&[b'o'; 100]).unwrap();
                            oversized += 1;
                        } else {
                            writer.write(b"0123456789").unwrap();
                        }
                        tokio::task::yield_now().await;
                    }
                    oversized
                })
            })
            .collect();

        let mut oversized = 0;
        for producer in producers {
            oversized += producer.await.unwrap();
        }
        writer.close().await.unwrap();

        assert!(oversized > 0);
        assert_eq!(sink.total_bytes(), oversized * 100 + (PRODUCERS * ROUNDS - oversized) * 10);
        assert!(writer.stats().buffer_allocs <= 2);
        assert!(writer.pool().idle() <= 2);
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    async fn run_write_after_close(config: Config) {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), config).unwrap();
        writer.write(b"before").unwrap();
        writer.close().await.unwrap();

        assert!(writer.is_closed());
        assert!(matches!(writer.write(b"after"), Err(Error::WriteOnClosed)));
        // Closing again is harmless
        writer.close().await.unwrap();
        assert_eq!(sink.calls(), vec![b"before".to_vec()]);
    }

    #[tokio::test]
    async fn test_write_after_close_locked() {
        run_write_after_close(Config::new()).await;
    }

    #[tokio::test]
    async fn test_write_after_close_queued() {
        run_write_after_close(queued(4)).await;
    }

    async fn run_close_takes_no_fresh_buffer(config: Config) {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), config).unwrap();
        writer.write(b"last").unwrap();
        writer.close().await.unwrap();

        assert_eq!(sink.calls(), vec![b"last".to_vec()]);
        assert_eq!(writer.stats().buffer_allocs, 1);
        assert_eq!(writer.pool().idle(), 1);
    }

    #[tokio::test]
    async fn test_close_takes_no_fresh_buffer_locked() {
        run_close_takes_no_fresh_buffer(Config::new()).await;
    }

    #[tokio::test]
    async fn test_close_takes_no_fresh_buffer_queued() {
        run_close_takes_no_fresh_buffer(queued(4)).await;
    }

    #[tokio::test]
    async fn test_empty_write() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), Config::new()).unwrap();
        assert_eq!(writer.write(b"").unwrap(), 0);
        writer.close().await.unwrap();
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_flush_locked() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), Config::new()).unwrap();
        writer.write(b"abc").unwrap();
        writer.flush();
        settle().await;
        assert_eq!(sink.calls(), vec![b"abc".to_vec()]);
        writer.close().await.unwrap();
        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_flush_queued() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), queued(4)).unwrap();
        writer.write(b"abc").unwrap();
        settle().await;
        writer.flush();
        settle().await;
        assert_eq!(sink.calls(), vec![b"abc".to_vec()]);
        writer.close().await.unwrap();
    }

    async fn run_drop_without_close(config: Config) {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), config).unwrap();
        writer.write(b"unclosed").unwrap();
        drop(writer);
        settle().await;
        assert_eq!(sink.calls(), vec![b"unclosed".to_vec()]);
    }

    #[tokio::test]
    async fn test_drop_flushes_locked() {
        run_drop_without_close(Config::new()).await;
    }

    #[tokio::test]
    async fn test_drop_flushes_queued() {
        run_drop_without_close(queued(4)).await;
    }

    #[tokio::test]
    async fn test_io_write_impl() {
        use std::io::Write;

        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(Arc::clone(&sink), Config::new()).unwrap();
        let mut out = &writer;
        write!(out, "level={} msg={}", "info", "ready").unwrap();
        Write::flush(&mut out).unwrap();
        writer.close().await.unwrap();
        assert_eq!(sink.calls().concat(), b"level=info msg=ready".to_vec());

        let err = Write::write(&mut out, b"late").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_new_requires_runtime() {
        let result = BufferedWriter::new(RecordingSink::default(), Config::new());
        assert!(matches!(result, Err(Error::NoRuntime(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let result = BufferedWriter::with_handle(
            RecordingSink::default(),
            Config::new().with_admission(Admission::NonBlocking { queue_size: 0 }),
            rt.handle().clone(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    /// Producers on plain OS threads share a writer driven by a runtime
    /// handle.
    #[test]
    fn test_writes_from_std_threads() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let writer = Arc::new(
            BufferedWriter::with_handle(
                Arc::clone(&sink),
                Config::new().with_buffer_size(128),
                rt.handle().clone(),
            )
            .unwrap(),
        );

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        writer.write(b"0123456789\n").unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        rt.block_on(writer.close()).unwrap();
        assert_eq!(sink.total_bytes(), 4 * 100 * 11);
    }
}

// ============================================================================
// Failures and stats
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_sink_failure_counted_and_buffer_recycled() {
        init_tracing();
        let writer = BufferedWriter::new(FailingSink, Config::new()).unwrap();
        writer.write(b"lost").unwrap();

        let err = writer.close().await.unwrap_err();
        assert!(matches!(err, Error::FlushFailed { errors: 1 }));
        assert_eq!(writer.stats().flush_errors, 1);
        assert_eq!(writer.pool().idle(), 1);
    }

    #[tokio::test]
    async fn test_direct_write_failure_counted() {
        let writer = BufferedWriter::new(FailingSink, Config::new().with_buffer_size(4)).unwrap();
        writer.write(b"oversized").unwrap();
        assert!(matches!(
            writer.close().await,
            Err(Error::FlushFailed { errors: 1 })
        ));
    }

    #[tokio::test]
    async fn test_short_write_counted() {
        let writer = BufferedWriter::new(ShortSink, Config::new()).unwrap();
        writer.write(b"abc").unwrap();
        writer.flush();
        writer.write(b"def").unwrap();
        assert!(matches!(
            writer.close().await,
            Err(Error::FlushFailed { errors: 2 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_timeout_unblocks_close() {
        init_tracing();
        let writer = BufferedWriter::new(
            StalledSink,
            Config::new().with_sink_timeout(Duration::from_secs(1)),
        )
        .unwrap();
        writer.write(b"stuck").unwrap();
        assert!(matches!(
            writer.close().await,
            Err(Error::FlushFailed { errors: 1 })
        ));
    }

    #[tokio::test]
    async fn test_pool_bounds_allocations() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::new(
            Arc::clone(&sink),
            Config::new().with_buffer_size(16).with_pool_size(2),
        )
        .unwrap();

        for _ in 0..20 {
            writer.write(&[b'q'; 10]).unwrap();
            settle().await;
        }
        assert_eq!(writer.stats().buffer_allocs, 2);
        assert!(writer.pool().idle() <= 2);

        writer.close().await.unwrap();
        assert_eq!(sink.total_bytes(), 200);
    }

    #[tokio::test]
    async fn test_prefilled_pool_counts_no_allocs() {
        let writer = BufferedWriter::new(
            RecordingSink::default(),
            Config::new().with_pool_size(3).with_prefill_pool(true),
        )
        .unwrap();
        assert_eq!(writer.stats().buffer_allocs, 0);
        writer.close().await.unwrap();
    }
}
