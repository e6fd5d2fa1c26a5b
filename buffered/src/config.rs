//! Writer configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default capacity of each pooled buffer, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default number of idle buffers retained by the pool.
pub const DEFAULT_POOL_SIZE: usize = 2;

/// How producer writes are admitted into the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Admission {
    /// Writes go straight into the current buffer under a short lock. A
    /// write that does not fit flushes the current buffer first, so writes
    /// are only ever rejected once the writer is closed.
    #[default]
    AlwaysAccept,
    /// Writes are queued onto a bounded channel served by a background task.
    /// A write that finds the queue full is rejected with
    /// [`Error::Dropped`] instead of blocking.
    NonBlocking {
        /// Number of pending writes the queue holds.
        queue_size: usize,
    },
}

/// Buffered writer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of each buffer. Payloads at least this large bypass the
    /// buffers and are written to the sink directly.
    pub buffer_size: usize,
    /// Maximum number of idle buffers the pool retains.
    pub pool_size: usize,
    /// Period of timer-triggered flushes. Zero disables the timer.
    pub flush_interval: Duration,
    /// Admission policy for producer writes.
    pub admission: Admission,
    /// Deadline on every sink call. `None` waits forever.
    pub sink_timeout: Option<Duration>,
    /// Populate the pool with `pool_size` buffers at construction.
    pub prefill_pool: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            flush_interval: Duration::ZERO,
            admission: Admission::AlwaysAccept,
            sink_timeout: None,
            prefill_pool: false,
        }
    }
}

impl Config {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the buffer capacity in bytes.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the number of idle buffers kept by the pool.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the flush interval. `Duration::ZERO` disables timer flushes.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Use the non-blocking admission policy with the given queue size.
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.admission = Admission::NonBlocking { queue_size };
        self
    }

    /// Set the admission policy.
    pub fn with_admission(mut self, admission: Admission) -> Self {
        self.admission = admission;
        self
    }

    /// Set a deadline on every sink call.
    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = Some(timeout);
        self
    }

    /// Populate the pool up front.
    pub fn with_prefill_pool(mut self, prefill: bool) -> Self {
        self.prefill_pool = prefill;
        self
    }

    /// Returns the flush interval if timer flushes are enabled.
    pub fn timer_period(&self) -> Option<Duration> {
        (!self.flush_interval.is_zero()).then_some(self.flush_interval)
    }

    /// Check the config for values the writer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer_size must be greater than 0".into()));
        }
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be greater than 0".into()));
        }
        if let Admission::NonBlocking { queue_size: 0 } = self.admission {
            return Err(Error::InvalidConfig("queue_size must be greater than 0".into()));
        }
        if self.sink_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig("sink_timeout must be non-zero".into()));
        }
        Ok(())
    }
}
