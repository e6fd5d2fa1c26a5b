//! Leaky pool of fixed buffers.

use parking_lot::Mutex;

use crate::fixed_buffer::FixedBuffer;

/// A bounded pool of reusable [`FixedBuffer`]s.
///
/// `acquire` hands out an idle buffer, or allocates a new one when none is
/// idle. `release` takes a buffer back, or drops it when `limit` buffers are
/// already idle. Idle memory is therefore capped at `limit * capacity` while
/// bursts can still borrow more buffers than the pool retains.
///
/// Neither operation blocks beyond the short lock on the idle list.
///
/// # Example
///
/// ```
/// use tickio_buffered::BufferPool;
///
/// let pool = BufferPool::new(2, 1024);
/// let (buf, allocated) = pool.acquire();
/// assert!(allocated);
/// pool.release(buf);
///
/// let (_buf, allocated) = pool.acquire();
/// assert!(!allocated);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<FixedBuffer>>,
    limit: usize,
    capacity: usize,
}

impl BufferPool {
    /// Creates an empty pool retaining at most `limit` buffers of
    /// `capacity` bytes each.
    pub fn new(limit: usize, capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(limit)),
            limit,
            capacity,
        }
    }

    /// Creates a pool already holding `limit` idle buffers.
    pub fn prefilled(limit: usize, capacity: usize) -> Self {
        let idle = (0..limit).map(|_| FixedBuffer::new(capacity)).collect();
        Self {
            idle: Mutex::new(idle),
            limit,
            capacity,
        }
    }

    /// Returns an idle buffer, allocating one if the pool is empty.
    ///
    /// The flag is true when a new buffer was allocated.
    pub fn acquire(&self) -> (FixedBuffer, bool) {
        match self.idle.lock().pop() {
            Some(buf) => (buf, false),
            None => (FixedBuffer::new(self.capacity), true),
        }
    }

    /// Resets `buf` and returns it to the pool. The buffer is dropped if
    /// the pool is full or the buffer has a foreign capacity.
    pub fn release(&self, mut buf: FixedBuffer) {
        if buf.capacity() != self.capacity {
            return;
        }
        buf.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.limit {
            idle.push(buf);
        }
    }

    /// Returns the number of idle buffers.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Returns the maximum number of idle buffers retained.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the capacity of the buffers this pool hands out.
    pub fn buffer_capacity(&self) -> usize {
        self.capacity
    }
}
