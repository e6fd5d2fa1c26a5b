//! Buffered writer façade.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::{Admission, Config};
use crate::error::{Error, Result};
use crate::flusher::{AsyncFlusher, Payload, Slot, next_tick, ticker};
use crate::pool::BufferPool;
use crate::sink::Sink;
use crate::stats::Stats;

/// Buffers small, frequent writes in front of a slow sink.
///
/// Writes are coalesced into pooled [`FixedBuffer`](crate::FixedBuffer)s.
/// A buffer is flushed to the sink when the next write does not fit, when
/// the flush timer fires, or on [`flush`](Self::flush) and
/// [`close`](Self::close). Each flush runs as its own background task, so
/// `write` never waits for the sink.
///
/// # Semantics
///
/// - **Write**: returns the payload length once it is queued or buffered,
///   not once it reaches the sink
/// - **Oversized**: a payload of at least `buffer_size` bytes is written to
///   the sink directly, in one call
/// - **Ordering**: payloads sharing a buffer reach the sink in write order;
///   different buffers may reach the sink in any order or concurrently
/// - **Failures**: sink errors are counted in [`Stats::flush_errors`] and
///   the block is discarded; nothing is retried
/// - **Close**: flushes what is left and waits for every in-flight drain
/// - **Memory**: the pool bounds idle buffers only. Each buffer being
///   drained stays alive until its sink call returns, so a stalled sink
///   keeps one buffer per pending flush. Set [`Config::sink_timeout`] to
///   bound how long that lasts
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tickio_buffered::{AsyncWriteSink, BufferedWriter, Config};
///
/// #[tokio::main]
/// async fn main() -> tickio_buffered::Result<()> {
///     let stream = tokio::net::TcpStream::connect("127.0.0.1:5170").await?;
///     let config = Config::new()
///         .with_buffer_size(16 * 1024)
///         .with_flush_interval(Duration::from_secs(1));
///     let writer = BufferedWriter::new(AsyncWriteSink::new(stream), config)?;
///
///     writer.write(b"hello\n")?;
///     writer.close().await
/// }
/// ```
pub struct BufferedWriter {
    flusher: Arc<AsyncFlusher>,
    front: Front,
    cancel: CancellationToken,
}

enum Front {
    /// Always-accept: producers write into the slot under a short lock.
    Locked(Arc<Mutex<Slot>>),
    /// Non-blocking: producers enqueue, the listener task owns the slot.
    Queued {
        tx: mpsc::Sender<Bytes>,
        flush_requested: Arc<Notify>,
        closed: AtomicBool,
    },
}

impl BufferedWriter {
    /// Creates a writer on the current tokio runtime.
    ///
    /// Returns [`Error::NoRuntime`] when called outside a runtime.
    pub fn new<S: Sink>(sink: S, config: Config) -> Result<Self> {
        let handle = Handle::try_current()?;
        Self::with_handle(sink, config, handle)
    }

    /// Creates a writer whose background tasks run on `handle`.
    ///
    /// Writes may then come from any thread, inside a runtime or not.
    pub fn with_handle<S: Sink>(sink: S, config: Config, handle: Handle) -> Result<Self> {
        config.validate()?;

        let pool = if config.prefill_pool {
            BufferPool::prefilled(config.pool_size, config.buffer_size)
        } else {
            BufferPool::new(config.pool_size, config.buffer_size)
        };
        let flusher = Arc::new(AsyncFlusher::new(
            Arc::new(sink),
            pool,
            handle,
            config.sink_timeout,
        ));
        let cancel = CancellationToken::new();
        let slot = flusher.open_slot();
        let period = config.timer_period();

        let front = match config.admission {
            Admission::AlwaysAccept => {
                let slot = Arc::new(Mutex::new(slot));
                if let Some(period) = period {
                    flusher.spawn(run_timer(
                        Arc::clone(&flusher),
                        Arc::clone(&slot),
                        cancel.clone(),
                        period,
                    ));
                }
                Front::Locked(slot)
            }
            Admission::NonBlocking { queue_size } => {
                let (tx, rx) = mpsc::channel(queue_size);
                let flush_requested = Arc::new(Notify::new());
                flusher.spawn(run_listener(
                    Arc::clone(&flusher),
                    slot,
                    rx,
                    Arc::clone(&flush_requested),
                    cancel.clone(),
                    period,
                ));
                Front::Queued {
                    tx,
                    flush_requested,
                    closed: AtomicBool::new(false),
                }
            }
        };

        debug!(
            buffer_size = config.buffer_size,
            pool_size = config.pool_size,
            admission = ?config.admission,
            flush_interval = ?config.flush_interval,
            "buffered writer started"
        );

        Ok(Self {
            flusher,
            front,
            cancel,
        })
    }

    /// Writes a payload.
    ///
    /// Returns `payload.len()` once the payload is buffered, queued or
    /// dispatched to the sink. Fails with [`Error::WriteOnClosed`] after
    /// `close`, and with [`Error::Dropped`] when the non-blocking admission
    /// queue is full.
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        match &self.front {
            Front::Locked(slot) => {
                let empty = payload.is_empty();
                let payload = Payload::for_capacity(payload, self.flusher.buffer_capacity());
                let mut slot = slot.lock();
                if slot.closed {
                    return Err(Error::WriteOnClosed);
                }
                if empty {
                    return Ok(0);
                }
                self.flusher.accept(&mut slot, payload)
            }
            Front::Queued { tx, closed, .. } => {
                if closed.load(Ordering::Acquire) {
                    return Err(Error::WriteOnClosed);
                }
                if payload.is_empty() {
                    return Ok(0);
                }
                match tx.try_send(Bytes::copy_from_slice(payload)) {
                    Ok(()) => Ok(payload.len()),
                    Err(TrySendError::Full(_)) => {
                        self.flusher.record_drop();
                        Err(Error::Dropped)
                    }
                    Err(TrySendError::Closed(_)) => Err(Error::WriteOnClosed),
                }
            }
        }
    }

    /// Requests a flush of the current buffer without waiting for the
    /// drain. A no-op on a closed writer.
    pub fn flush(&self) {
        match &self.front {
            Front::Locked(slot) => {
                let mut slot = slot.lock();
                if !slot.closed {
                    self.flusher.trigger(&mut slot);
                }
            }
            Front::Queued {
                flush_requested,
                closed,
                ..
            } => {
                if !closed.load(Ordering::Acquire) {
                    flush_requested.notify_one();
                }
            }
        }
    }

    /// Closes the writer.
    ///
    /// Stops admitting writes, flushes what is buffered and waits until
    /// every in-flight drain has finished. Returns [`Error::FlushFailed`]
    /// if any drain or direct write failed during the writer's lifetime.
    ///
    /// A sink call that never returns makes `close` wait forever unless
    /// [`Config::sink_timeout`] is set.
    pub async fn close(&self) -> Result<()> {
        match &self.front {
            Front::Locked(slot) => {
                let mut slot = slot.lock();
                if !slot.closed {
                    self.flusher.finish(&mut slot);
                }
            }
            Front::Queued { closed, .. } => closed.store(true, Ordering::Release),
        }
        self.cancel.cancel();
        self.flusher.wait().await;

        debug!(stats = ?self.stats(), "buffered writer closed");
        self.flusher.outcome()
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        match &self.front {
            Front::Locked(slot) => slot.lock().closed,
            Front::Queued { closed, .. } => closed.load(Ordering::Acquire),
        }
    }

    /// Returns a snapshot of the writer statistics.
    pub fn stats(&self) -> Stats {
        self.flusher.stats()
    }

    /// Returns the capacity of each buffer.
    pub fn buffer_size(&self) -> usize {
        self.flusher.buffer_capacity()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &BufferPool {
        self.flusher.pool()
    }
}

impl Drop for BufferedWriter {
    fn drop(&mut self) {
        // Best effort: dispatch what is buffered, nobody waits for it.
        if let Front::Locked(slot) = &self.front {
            let mut slot = slot.lock();
            if !slot.closed {
                self.flusher.finish(&mut slot);
            }
        }
        self.cancel.cancel();
    }
}

impl io::Write for &BufferedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferedWriter::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedWriter::flush(*self);
        Ok(())
    }
}

impl io::Write for BufferedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferedWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedWriter::flush(self);
        Ok(())
    }
}

/// Timer task of the always-accept policy.
async fn run_timer(
    flusher: Arc<AsyncFlusher>,
    slot: Arc<Mutex<Slot>>,
    cancel: CancellationToken,
    period: std::time::Duration,
) {
    let mut ticker = ticker(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => flusher.on_tick(&mut slot.lock()),
        }
    }
    trace!("flush timer stopped");
}

/// Listener task of the non-blocking policy. Owns the slot.
async fn run_listener(
    flusher: Arc<AsyncFlusher>,
    mut slot: Slot,
    mut rx: mpsc::Receiver<Bytes>,
    flush_requested: Arc<Notify>,
    cancel: CancellationToken,
    period: Option<std::time::Duration>,
) {
    let mut ticker = period.map(ticker);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            payload = rx.recv() => match payload {
                Some(payload) => admit(&flusher, &mut slot, payload),
                None => break,
            },
            _ = flush_requested.notified() => flusher.trigger(&mut slot),
            _ = next_tick(&mut ticker) => flusher.on_tick(&mut slot),
        }
    }

    // Writes that made it into the queue before close are still served.
    rx.close();
    while let Some(payload) = rx.recv().await {
        admit(&flusher, &mut slot, payload);
    }
    flusher.finish(&mut slot);
    trace!("admission listener stopped");
}

fn admit(flusher: &AsyncFlusher, slot: &mut Slot, payload: Bytes) {
    if let Err(e) = flusher.accept(slot, Payload::Owned(payload)) {
        warn!(error = %e, "queued write discarded");
    }
}
