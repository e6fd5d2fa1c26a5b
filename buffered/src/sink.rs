//! The byte sink a writer flushes into.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Destination of flushed bytes.
///
/// A sink may receive concurrent calls: several drains of detached buffers
/// can be in flight at the same time, together with direct writes of
/// oversized payloads. Returning fewer bytes than handed in without an error
/// counts as a short write.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Writes `buf` and returns the number of bytes accepted.
    async fn write(&self, buf: &[u8]) -> io::Result<usize>;
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf).await
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf).await
    }
}

/// Adapts any [`AsyncWrite`] (a TCP stream, a file) into a [`Sink`].
///
/// Concurrent sink calls are serialized on an async mutex so that each
/// flushed block reaches the stream contiguously.
pub struct AsyncWriteSink<W> {
    inner: Mutex<W>,
}

impl<W> AsyncWriteSink<W> {
    /// Wraps a stream.
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

#[async_trait]
impl<W> Sink for AsyncWriteSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().await;
        inner.write_all(buf).await?;
        inner.flush().await?;
        Ok(buf.len())
    }
}

/// Hands `data` to the sink in a single call and checks the byte count.
pub(crate) async fn write_once<S: Sink + ?Sized>(sink: &S, data: &[u8]) -> Result<()> {
    let written = sink.write(data).await?;
    if written > data.len() {
        return Err(Error::Sink(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("sink reported {} bytes written for a {} byte block", written, data.len()),
        )));
    }
    if written < data.len() {
        return Err(Error::ShortWrite {
            written,
            expected: data.len(),
        });
    }
    Ok(())
}
