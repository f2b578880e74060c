//! Bluetooth Serial Port Profile transport.
//!
//! The printer must be paired and bound to an RFCOMM TTY beforehand
//! (`rfcomm bind 0 <MAC> 1` creates `/dev/rfcomm0`). The transport accepts
//! either that device path directly or the printer MAC, which it resolves to
//! the bound TTY through `/proc/net/rfcomm` or `rfcomm -a`.

use async_trait::async_trait;
use domain::{ConnectError, PrinterAddress, PrinterStream, PrinterTransport};
use std::path::Path;
use tokio::process::Command;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use super::stream::IoStream;

const RFCOMM_PROC_TABLE: &str = "/proc/net/rfcomm";

pub struct RfcommTransport {
    baud_rate: u32,
}

impl RfcommTransport {
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }

    async fn resolve_device(&self, address: &PrinterAddress) -> Result<String, ConnectError> {
        if address.as_str().starts_with('/') {
            return Ok(address.as_str().to_string());
        }

        if !address.is_mac() {
            return Err(ConnectError::InvalidAddress(format!(
                "{} is neither a Bluetooth MAC nor a device path",
                address
            )));
        }

        if let Ok(table) = tokio::fs::read_to_string(RFCOMM_PROC_TABLE).await {
            if let Some(device) = existing_device(find_bound_device(&table, address.as_str())) {
                return Ok(device);
            }
        }

        // Fallback: ask the rfcomm tool for its bindings
        match Command::new("rfcomm").arg("-a").output().await {
            Ok(output) => {
                let listing = String::from_utf8_lossy(&output.stdout);
                if let Some(device) = existing_device(find_bound_device(&listing, address.as_str()))
                {
                    return Ok(device);
                }
            }
            Err(e) => debug!(error = %e, "Failed to run 'rfcomm -a'"),
        }

        Err(ConnectError::Unreachable(format!(
            "No RFCOMM device bound to {}. Pair the printer and run `rfcomm bind 0 {} 1`",
            address, address
        )))
    }
}

impl Default for RfcommTransport {
    fn default() -> Self {
        Self::new(115_200)
    }
}

#[async_trait]
impl PrinterTransport for RfcommTransport {
    async fn connect(
        &self,
        address: &PrinterAddress,
    ) -> Result<Box<dyn PrinterStream>, ConnectError> {
        let device = self.resolve_device(address).await?;

        debug!(device = %device, baud_rate = self.baud_rate, "Opening RFCOMM device");
        let port = tokio_serial::new(&device, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                ConnectError::Unreachable(format!(
                    "Failed to open {}: {}. Tip: check the printer is powered on and you have access to the device",
                    device, e
                ))
            })?;

        info!(%address, device = %device, "RFCOMM device opened");
        Ok(Box::new(IoStream::new(port, device)))
    }

    fn connection_kind(&self) -> &'static str {
        "bluetooth"
    }
}

/// Find the `/dev/rfcommN` bound to `mac` in an RFCOMM listing.
///
/// Lines look like `rfcomm0: 00:11:22:33:44:55 channel 1 clean`.
pub fn find_bound_device(listing: &str, mac: &str) -> Option<String> {
    let mac = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac))
        .find_map(|line| {
            let (name, _) = line.split_once(':')?;
            let name = name.trim();
            let index = name.strip_prefix("rfcomm")?;
            if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some(format!("/dev/{}", name))
        })
}

fn existing_device(device: Option<String>) -> Option<String> {
    device.filter(|path| Path::new(path).exists())
}
