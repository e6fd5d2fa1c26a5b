//! Pooled, timer-flushed write buffering in front of slow byte sinks.
//!
//! This crate absorbs bursts of small writes from many concurrent producers,
//! coalesces them into larger blocks and ships those blocks to a slow sink
//! (a socket, an HTTP endpoint, a log shipper) in the background. Producers
//! never wait for the sink and memory stays bounded.
//!
//! - [`FixedBuffer`]: a byte buffer that never grows
//! - [`BufferPool`]: a leaky pool recycling fixed buffers
//! - [`BufferedWriter`]: the producer-facing writer that swaps a full buffer
//!   for a fresh one and drains the full one as a background task
//! - [`Sink`]: where flushed bytes go
//!
//! # Flushing
//!
//! The current buffer is flushed when:
//!
//! - a write does not fit into what is left of it
//! - the flush timer fires and nothing was flushed since the previous tick
//! - [`BufferedWriter::flush`] or [`BufferedWriter::close`] is called
//!
//! Payloads of at least one buffer capacity skip the buffers and go to the
//! sink in a single direct call.
//!
//! # Admission
//!
//! [`Admission::AlwaysAccept`] writes into the current buffer under a short
//! lock and never rejects a write before close.
//! [`Admission::NonBlocking`] queues writes onto a bounded channel and
//! rejects them with [`Error::Dropped`] when the queue is full.
//!
//! ```no_run
//! use std::time::Duration;
//! use tickio_buffered::{AsyncWriteSink, BufferedWriter, Config};
//!
//! #[tokio::main]
//! async fn main() -> tickio_buffered::Result<()> {
//!     let file = tokio::fs::File::create("/tmp/tickio.log").await?;
//!     let writer = BufferedWriter::new(
//!         AsyncWriteSink::new(file),
//!         Config::new()
//!             .with_queue_size(1024)
//!             .with_flush_interval(Duration::from_millis(500)),
//!     )?;
//!
//!     for i in 0..100 {
//!         if let Err(e) = writer.write(format!("line {}\n", i).as_bytes()) {
//!             eprintln!("dropped: {}", e);
//!         }
//!     }
//!
//!     writer.close().await?;
//!     println!("{:?}", writer.stats());
//!     Ok(())
//! }
//! ```
//!
//! # Delivery
//!
//! Delivery is best effort. A failed drain is counted in
//! [`Stats::flush_errors`] and its block is discarded; `close` reports the
//! aggregate as [`Error::FlushFailed`].

mod config;
mod error;
mod fixed_buffer;
mod flusher;
mod pool;
mod sink;
mod stats;
mod writer;

pub use config::{Admission, Config, DEFAULT_BUFFER_SIZE, DEFAULT_POOL_SIZE};
pub use error::{Error, Result};
pub use fixed_buffer::FixedBuffer;
pub use pool::BufferPool;
pub use sink::{AsyncWriteSink, Sink};
pub use stats::Stats;
pub use writer::BufferedWriter;

#[cfg(test)]
mod tests;
