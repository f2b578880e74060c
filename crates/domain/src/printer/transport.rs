use async_trait::async_trait;
use std::io;

use super::address::PrinterAddress;
use crate::error::ConnectError;

/// A live byte stream to the printer
///
/// Owned exclusively by the printer link; never handed out to callers.
#[async_trait]
pub trait PrinterStream: Send {
    /// Write the whole buffer
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush buffered bytes to the device
    async fn flush(&mut self) -> io::Result<()>;

    /// Close the stream; further writes are invalid
    async fn close(&mut self) -> io::Result<()>;

    /// Cheap liveness hint, checked before reusing a cached stream
    fn is_open(&self) -> bool {
        true
    }
}

/// Connect primitive supplied by the transport collaborator
#[async_trait]
pub trait PrinterTransport: Send + Sync {
    /// Open a new stream to the given address
    async fn connect(&self, address: &PrinterAddress)
    -> Result<Box<dyn PrinterStream>, ConnectError>;

    /// Connection type reported to discovery clients (e.g. "bluetooth")
    fn connection_kind(&self) -> &'static str;
}
