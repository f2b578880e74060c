use serde::{Deserialize, Serialize};

/// Connection state of the single printer session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No open stream, no connection attempt in progress
    #[default]
    Disconnected,
    /// Currently attempting to open a stream
    Connecting,
    /// A stream is open and was usable at last contact
    Connected,
    /// The last connection attempt failed; the next use retries
    Failed,
}

impl ConnectionState {
    /// Check if state allows a connection attempt
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Transition to connecting state
    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected | Self::Failed => Ok(Self::Connecting),
            _ => Err("Can only connect from Disconnected or Failed state"),
        }
    }

    /// Transition to connected state
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting state"),
        }
    }

    /// Transition to disconnected state
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }

    /// Transition to failed state
    pub fn to_failed(&self) -> Self {
        Self::Failed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
