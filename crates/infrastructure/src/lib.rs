//! Infrastructure layer - Printer transports and configuration

pub mod config;
pub mod transport;

pub use config::BridgeConfig;
pub use transport::{MockTransport, RfcommTransport, TcpTransport, TransportFactory};
