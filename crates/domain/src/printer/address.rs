use crate::error::ConnectError;
use serde::{Deserialize, Serialize};

/// Value object identifying the target printer
///
/// Usually a Bluetooth MAC address (`AA:BB:CC:DD:EE:FF`), but the format is
/// left to the transport: a device path or `host:port` is accepted as well.
///
/// Rules:
/// - Must be non-empty after trimming
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrinterAddress(String);

impl PrinterAddress {
    /// Create a new PrinterAddress with validation
    pub fn new(address: impl Into<String>) -> Result<Self, ConnectError> {
        let address = address.into();
        let trimmed = address.trim();

        if trimmed.is_empty() {
            return Err(ConnectError::InvalidAddress(
                "Printer address cannot be empty".to_string(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address has the `XX:XX:XX:XX:XX:XX` Bluetooth shape
    pub fn is_mac(&self) -> bool {
        let parts: Vec<&str> = self.0.split(':').collect();
        parts.len() == 6
            && parts
                .iter()
                .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
    }
}

impl std::fmt::Display for PrinterAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
