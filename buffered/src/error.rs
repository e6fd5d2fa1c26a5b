//! Error types for buffered writes.

use std::io;
use std::time::Duration;

/// Result type alias for tickio-buffered.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for buffer, pool and writer operations.
///
/// Producer-facing errors (`WriteOnClosed`, `Dropped`) are returned from
/// [`BufferedWriter::write`](crate::BufferedWriter::write). Sink-facing errors
/// (`ShortWrite`, `Sink`, `SinkTimeout`) happen inside background drains and
/// only show up in [`Stats::flush_errors`](crate::Stats::flush_errors) and in
/// the aggregated `FlushFailed` returned by `close`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A payload did not fit into the free space of a fixed buffer.
    #[error("capacity exceeded: payload has {len} bytes, buffer has {available} available")]
    CapacityExceeded { len: usize, available: usize },

    /// Write attempted after the writer was closed.
    #[error("write on closed writer")]
    WriteOnClosed,

    /// Admission queue was full; the payload was discarded.
    #[error("write was blocking: admission queue full")]
    Dropped,

    /// The sink accepted fewer bytes than it was handed.
    #[error("short write: sink wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The sink failed.
    #[error("sink error: {0}")]
    Sink(#[from] io::Error),

    /// The sink did not complete within the configured deadline.
    #[error("sink timeout after {0:?}")]
    SinkTimeout(Duration),

    /// One or more drains failed during the lifetime of the writer.
    #[error("{errors} flush(es) to the sink failed")]
    FlushFailed { errors: u64 },

    /// The writer was constructed outside of a tokio runtime.
    #[error("no tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match &e {
            Error::WriteOnClosed => io::ErrorKind::BrokenPipe,
            Error::Dropped => io::ErrorKind::WouldBlock,
            Error::ShortWrite { .. } => io::ErrorKind::WriteZero,
            Error::SinkTimeout(_) => io::ErrorKind::TimedOut,
            Error::InvalidConfig(_) => io::ErrorKind::InvalidInput,
            Error::Sink(inner) => inner.kind(),
            _ => io::ErrorKind::Other,
        };
        match e {
            Error::Sink(inner) => inner,
            other => io::Error::new(kind, other),
        }
    }
}
