//! Destinations for formatted records.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tickio_buffered::BufferedWriter;

/// Receives one formatted record per call.
///
/// Implementations must accept concurrent calls from any thread.
pub trait Output: Send + Sync {
    fn write(&self, record: &[u8]) -> io::Result<usize>;
}

impl<O: Output + ?Sized> Output for Arc<O> {
    fn write(&self, record: &[u8]) -> io::Result<usize> {
        (**self).write(record)
    }
}

/// Records are buffered and delivered to the writer's sink in the background.
impl Output for BufferedWriter {
    fn write(&self, record: &[u8]) -> io::Result<usize> {
        BufferedWriter::write(self, record).map_err(io::Error::from)
    }
}

impl Output for io::Stdout {
    fn write(&self, record: &[u8]) -> io::Result<usize> {
        let mut out = self.lock();
        out.write_all(record)?;
        Ok(record.len())
    }
}

impl Output for io::Stderr {
    fn write(&self, record: &[u8]) -> io::Result<usize> {
        let mut out = self.lock();
        out.write_all(record)?;
        Ok(record.len())
    }
}

/// In-memory output, mostly for tests.
impl Output for Mutex<Vec<u8>> {
    fn write(&self, record: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(record);
        Ok(record.len())
    }
}
