//! Byte streams produced by fetchers and consumed by decoders.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// An encoded image stream that can be force-closed from outside.
///
/// Decoders take the stream by value and decide when to drop it. The
/// pipeline keeps a [`SourceCloser`] so it can release the underlying reader
/// if decoding fails while some other task still holds the stream.
pub struct ImageSource {
    reader: Arc<Mutex<Option<BoxedReader>>>,
}

impl ImageSource {
    /// Wraps any async reader.
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    /// Wraps an in-memory buffer.
    #[must_use]
    pub fn from_bytes(bytes: Bytes) -> Self {
        Self::new(io::Cursor::new(bytes))
    }

    /// Returns a handle that can close this stream.
    #[must_use]
    pub fn closer(&self) -> SourceCloser {
        SourceCloser {
            reader: Arc::downgrade(&self.reader),
        }
    }

    /// Returns true once the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.reader.lock().is_none()
    }

    /// Reads the remaining bytes.
    ///
    /// # Errors
    /// Returns error if the reader fails or the stream was closed.
    pub async fn read_all(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Consumes the remaining bytes without keeping them.
    ///
    /// # Errors
    /// Returns error if the reader fails or the stream was closed.
    pub async fn drain(mut self) -> io::Result<u64> {
        tokio::io::copy(&mut self, &mut tokio::io::sink()).await
    }
}

impl AsyncRead for ImageSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut guard = self.reader.lock();
        match guard.as_mut() {
            Some(reader) => Pin::new(reader).poll_read(cx, buf),
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "image source was closed",
            ))),
        }
    }
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSource")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Closes an [`ImageSource`] without owning it.
#[derive(Debug, Clone)]
pub struct SourceCloser {
    reader: Weak<Mutex<Option<BoxedReader>>>,
}

impl SourceCloser {
    /// Drops the underlying reader; later reads fail with `BrokenPipe`.
    pub fn close(&self) {
        if let Some(reader) = self.reader.upgrade() {
            reader.lock().take();
        }
    }
}
