mod mock;
mod rfcomm;
mod stream;
mod tcp;

pub use mock::MockTransport;
pub use rfcomm::{RfcommTransport, find_bound_device};
pub use stream::IoStream;
pub use tcp::TcpTransport;

use crate::config::{PrinterSettings, TransportKind};
use domain::PrinterTransport;
use std::sync::Arc;

/// Factory for the configured printer transport
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(settings: &PrinterSettings) -> Arc<dyn PrinterTransport> {
        match settings.transport {
            TransportKind::Rfcomm => Arc::new(RfcommTransport::new(settings.baud_rate)),
            TransportKind::Tcp => Arc::new(TcpTransport::new(settings.tcp_port)),
        }
    }
}
