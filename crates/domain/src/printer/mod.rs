mod address;
mod connection_state;
mod transport;

pub use address::PrinterAddress;
pub use connection_state::ConnectionState;
pub use transport::{PrinterStream, PrinterTransport};
