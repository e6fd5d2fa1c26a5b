//! Fixed-capacity byte buffer.

use crate::error::{Error, Result};
use crate::sink::{Sink, write_once};

/// A byte buffer with a hard capacity.
///
/// Unlike `Vec<u8>`, a `FixedBuffer` never grows or shrinks. Its capacity is
/// what bounds the memory held by a [`BufferPool`](crate::BufferPool), and it
/// lets a full buffer be handed to a background drain without any size
/// coordination.
///
/// # Semantics
///
/// - **Write**: all-or-nothing; a payload larger than [`available`](Self::available)
///   is rejected with [`Error::CapacityExceeded`]
/// - **Drain**: the whole content goes to the sink in one call, then the
///   buffer is empty again
///
/// # Example
///
/// ```
/// use tickio_buffered::FixedBuffer;
///
/// let mut buf = FixedBuffer::new(8);
/// buf.write(b"hello").unwrap();
/// assert_eq!(buf.buffered(), 5);
/// assert_eq!(buf.available(), 3);
/// assert!(buf.write(b"world").is_err());
/// ```
#[derive(Debug)]
pub struct FixedBuffer {
    buf: Box<[u8]>,
    used: usize,
}

impl FixedBuffer {
    /// Allocates an empty buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            used: 0,
        }
    }

    /// Returns the number of bytes currently held.
    pub fn buffered(&self) -> usize {
        self.used
    }

    /// Returns the number of bytes that can still be written.
    pub fn available(&self) -> usize {
        self.buf.len() - self.used
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Returns the buffered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    /// Marks the buffer as empty. The storage is kept.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Copies `payload` into the buffer.
    ///
    /// Returns `payload.len()` on success. Nothing is written when the
    /// payload does not fit.
    pub fn write(&mut self, payload: &[u8]) -> Result<usize> {
        let available = self.available();
        if payload.len() > available {
            return Err(Error::CapacityExceeded {
                len: payload.len(),
                available,
            });
        }
        let end = self.used + payload.len();
        self.buf[self.used..end].copy_from_slice(payload);
        self.used = end;
        Ok(payload.len())
    }

    /// Writes all buffered bytes to `sink` in one call.
    ///
    /// On success the buffer is reset. On failure the content is kept, so
    /// the caller decides whether to discard it.
    pub async fn drain_to<S: Sink + ?Sized>(&mut self, sink: &S) -> Result<()> {
        if self.used == 0 {
            return Ok(());
        }
        write_once(sink, self.as_bytes()).await?;
        self.reset();
        Ok(())
    }
}
