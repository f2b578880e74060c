//! Domain layer - Pure bridge model with no runtime dependencies
//!
//! This crate contains:
//! - Value Objects (PrinterAddress, SubmissionId)
//! - The printer connection state machine (ConnectionState)
//! - Print jobs
//! - Collaborator interfaces (PrinterTransport, PrinterStream, ConfigProvider)
//!
//! Principles:
//! - No dependencies on infrastructure or an async runtime
//! - Transitions are enforced at domain level
//! - Testable in isolation

pub mod config;
pub mod error;
pub mod job;
pub mod printer;

// Re-export commonly used types
pub use config::ConfigProvider;
#[cfg(any(test, feature = "mocks"))]
pub use config::MockConfigProvider;
pub use error::{ConnectError, WriteError};
pub use job::{PrintJob, SubmissionId};
pub use printer::{ConnectionState, PrinterAddress, PrinterStream, PrinterTransport};
