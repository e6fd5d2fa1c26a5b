//! Writer statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of writer statistics.
///
/// Buffer size, pool size and flush interval are hard to tune up front;
/// these counters show how a given setting behaves under real load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Buffers that had to be allocated because the pool had no idle one.
    /// A pool that is not prefilled starts empty, so the first buffers
    /// count too.
    pub buffer_allocs: u64,
    /// Failed drains and direct writes to the sink.
    pub flush_errors: u64,
    /// Writes rejected because the admission queue was full.
    pub dropped_writes: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    buffer_allocs: AtomicU64,
    flush_errors: AtomicU64,
    dropped_writes: AtomicU64,
}

impl Counters {
    pub(crate) fn record_alloc(&self) {
        self.buffer_allocs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_error(&self) {
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.dropped_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            buffer_allocs: self.buffer_allocs.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
            dropped_writes: self.dropped_writes.load(Ordering::Relaxed),
        }
    }
}
