use async_trait::async_trait;
use domain::PrinterStream;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Adapts any async byte sink (serial TTY, TCP socket) to a printer stream
pub struct IoStream<S> {
    inner: Option<S>,
    label: String,
}

impl<S> IoStream<S> {
    pub fn new(inner: S, label: impl Into<String>) -> Self {
        Self {
            inner: Some(inner),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn open_mut(&mut self) -> io::Result<&mut S> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "stream closed"))
    }
}

#[async_trait]
impl<S> PrinterStream for IoStream<S>
where
    S: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.open_mut()?.write_all(bytes).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.open_mut()?.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut inner) => {
                tracing::debug!(stream = %self.label, "Closing printer stream");
                inner.shutdown().await
            }
            None => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_after_close_is_rejected() {
        let mut stream = IoStream::new(Vec::<u8>::new(), "buffer");
        stream.write_all(b"^XA").await.unwrap();
        stream.close().await.unwrap();

        assert!(!stream.is_open());
        let err = stream.write_all(b"^XZ").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        // Closing twice is harmless
        stream.close().await.unwrap();
    }
}
