//! Flush scheduling.
//!
//! The flusher owns nothing but the shared parts of a writer: sink, pool,
//! counters and the tracker of in-flight drains. The buffer open for writes
//! lives in a [`Slot`] owned by whoever admits writes: a mutex for the
//! always-accept policy, the listener task for the non-blocking one.
//!
//! A flush swaps the slot's buffer for a fresh one and hands the full buffer
//! to a detached drain task. The slow sink call always happens outside the
//! slot, so producers only ever wait for the in-memory swap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::task::TaskTracker;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::fixed_buffer::FixedBuffer;
use crate::pool::BufferPool;
use crate::sink::{Sink, write_once};
use crate::stats::{Counters, Stats};

/// A producer payload, borrowed from the caller or already owned.
pub(crate) enum Payload<'a> {
    Borrowed(&'a [u8]),
    Owned(Bytes),
}

impl<'a> Payload<'a> {
    /// Payloads bound for the direct path are copied here, before any slot
    /// lock is taken. Smaller ones stay borrowed until they are buffered.
    pub(crate) fn for_capacity(payload: &'a [u8], capacity: usize) -> Self {
        if payload.len() >= capacity {
            Payload::Owned(Bytes::copy_from_slice(payload))
        } else {
            Payload::Borrowed(payload)
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            Payload::Borrowed(p) => *p,
            Payload::Owned(b) => &b[..],
        }
    }

    fn into_bytes(self) -> Bytes {
        match self {
            Payload::Borrowed(p) => Bytes::copy_from_slice(p),
            Payload::Owned(b) => b,
        }
    }
}

/// The buffer currently open for writes, plus its flush bookkeeping.
pub(crate) struct Slot {
    current: FixedBuffer,
    /// Set by size-triggered and explicit flushes, cleared by the timer.
    /// Suppresses a timer flush right after another flush.
    flushed_since_tick: bool,
    pub(crate) closed: bool,
}

pub(crate) struct AsyncFlusher {
    sink: Arc<dyn Sink>,
    pool: Arc<BufferPool>,
    counters: Arc<Counters>,
    tracker: TaskTracker,
    handle: Handle,
    sink_timeout: Option<Duration>,
}

impl AsyncFlusher {
    pub(crate) fn new(
        sink: Arc<dyn Sink>,
        pool: BufferPool,
        handle: Handle,
        sink_timeout: Option<Duration>,
    ) -> Self {
        Self {
            sink,
            pool: Arc::new(pool),
            counters: Arc::new(Counters::default()),
            tracker: TaskTracker::new(),
            handle,
            sink_timeout,
        }
    }

    /// Opens a slot with a buffer taken from the pool.
    pub(crate) fn open_slot(&self) -> Slot {
        Slot {
            current: self.acquire(),
            flushed_since_tick: false,
            closed: false,
        }
    }

    /// Routes one payload.
    ///
    /// Payloads of at least one buffer capacity are written to the sink
    /// directly. Smaller payloads go into the current buffer, which is
    /// flushed first when the payload does not fit.
    pub(crate) fn accept(&self, slot: &mut Slot, payload: Payload<'_>) -> Result<usize> {
        let len = payload.as_slice().len();
        if len >= self.pool.buffer_capacity() {
            self.dispatch_direct(payload.into_bytes());
            slot.flushed_since_tick = true;
            return Ok(len);
        }
        if len > slot.current.available() {
            self.trigger(slot);
        }
        slot.current.write(payload.as_slice())
    }

    /// Flushes on external demand and marks the slot as recently flushed.
    pub(crate) fn trigger(&self, slot: &mut Slot) {
        if self.flush(slot) {
            slot.flushed_since_tick = true;
        }
    }

    /// Timer callback: flush unless something was flushed since the last tick.
    pub(crate) fn on_tick(&self, slot: &mut Slot) {
        if slot.flushed_since_tick {
            slot.flushed_since_tick = false;
        } else {
            self.flush(slot);
        }
    }

    /// Swaps a non-empty current buffer for a fresh one and dispatches a
    /// drain of the old one. Returns false if there was nothing to flush.
    pub(crate) fn flush(&self, slot: &mut Slot) -> bool {
        if slot.current.is_empty() {
            return false;
        }
        let full = std::mem::replace(&mut slot.current, self.acquire());
        trace!(bytes = full.buffered(), "buffer swapped out for drain");
        self.dispatch_drain(full);
        true
    }

    /// Closes the slot and dispatches a drain of its last buffer.
    ///
    /// Unlike [`flush`](Self::flush) no replacement is taken from the pool:
    /// the slot keeps a zero-capacity buffer that is never written again.
    pub(crate) fn finish(&self, slot: &mut Slot) {
        slot.closed = true;
        if slot.current.is_empty() {
            return;
        }
        let last = std::mem::replace(&mut slot.current, FixedBuffer::new(0));
        trace!(bytes = last.buffered(), "last buffer detached for drain");
        self.dispatch_drain(last);
    }

    /// Runs a background task of the writer (timer or listener). Tracked
    /// like drains so `wait` also covers it.
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn_on(task, &self.handle);
    }

    /// Waits until every tracked task has finished. No new task may be
    /// expected after the caller has stopped admitting writes.
    pub(crate) async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Aggregated drain outcome over the writer's lifetime.
    pub(crate) fn outcome(&self) -> Result<()> {
        match self.counters.snapshot().flush_errors {
            0 => Ok(()),
            errors => Err(Error::FlushFailed { errors }),
        }
    }

    pub(crate) fn record_drop(&self) {
        self.counters.record_drop();
    }

    pub(crate) fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    pub(crate) fn buffer_capacity(&self) -> usize {
        self.pool.buffer_capacity()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &BufferPool {
        &self.pool
    }

    fn acquire(&self) -> FixedBuffer {
        let (buf, allocated) = self.pool.acquire();
        if allocated {
            self.counters.record_alloc();
        }
        buf
    }

    fn dispatch_drain(&self, mut buf: FixedBuffer) {
        let sink = Arc::clone(&self.sink);
        let pool = Arc::clone(&self.pool);
        let counters = Arc::clone(&self.counters);
        let limit = self.sink_timeout;
        self.spawn(async move {
            let bytes = buf.buffered();
            if let Err(e) = with_deadline(limit, buf.drain_to(&*sink)).await {
                counters.record_flush_error();
                warn!(bytes, error = %e, "drain to sink failed, block discarded");
            }
            pool.release(buf);
        });
    }

    fn dispatch_direct(&self, payload: Bytes) {
        let sink = Arc::clone(&self.sink);
        let counters = Arc::clone(&self.counters);
        let limit = self.sink_timeout;
        trace!(bytes = payload.len(), "oversized payload bypasses buffers");
        self.spawn(async move {
            if let Err(e) = with_deadline(limit, write_once(&*sink, &payload)).await {
                counters.record_flush_error();
                warn!(bytes = payload.len(), error = %e, "direct write to sink failed");
            }
        });
    }
}

/// Creates the flush timer. The first tick fires one period from now.
pub(crate) fn ticker(period: Duration) -> Interval {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Waits for the next tick, or forever when the timer is disabled.
pub(crate) async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn with_deadline<F>(limit: Option<Duration>, op: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match limit {
        Some(limit) => time::timeout(limit, op)
            .await
            .map_err(|_| Error::SinkTimeout(limit))?,
        None => op.await,
    }
}
