use async_trait::async_trait;
use domain::{ConnectError, PrinterAddress, PrinterStream, PrinterTransport};
use tokio::net::TcpStream;
use tracing::{info, warn};

use super::stream::IoStream;

/// Raw port printing (`host:port`, JetDirect style)
pub struct TcpTransport {
    default_port: u16,
}

impl TcpTransport {
    pub fn new(default_port: u16) -> Self {
        Self { default_port }
    }

    fn target(&self, address: &PrinterAddress) -> String {
        match address.as_str().rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                address.as_str().to_string()
            }
            _ => format!("{}:{}", address, self.default_port),
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(9100)
    }
}

#[async_trait]
impl PrinterTransport for TcpTransport {
    async fn connect(
        &self,
        address: &PrinterAddress,
    ) -> Result<Box<dyn PrinterStream>, ConnectError> {
        let target = self.target(address);
        info!("Connecting to printer at {}", target);

        let stream = TcpStream::connect(&target)
            .await
            .map_err(|e| ConnectError::Unreachable(format!("{}: {}", target, e)))?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!(target = %target, error = %e, "Failed to disable Nagle on printer socket");
        }

        Ok(Box::new(IoStream::new(stream, target)))
    }

    fn connection_kind(&self) -> &'static str {
        "network"
    }
}
