use thiserror::Error;

/// Failure to establish a stream to the configured printer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("No printer configured")]
    NotConfigured,

    #[error("Invalid printer address: {0}")]
    InvalidAddress(String),

    #[error("Printer unreachable: {0}")]
    Unreachable(String),

    #[error("Connection timed out after {0} ms")]
    Timeout(u64),
}

/// Failure while pushing a payload to the printer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Write failed: {0}")]
    Io(String),

    #[error("Write timed out after {0} ms")]
    Timeout(u64),
}

impl WriteError {
    /// True when the payload never reached an open stream
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Connect(_))
    }
}
