pub mod api;
pub mod bridge;
pub mod state;

pub use bridge::{BridgeCore, BridgeError, BridgeSettings};
pub use state::{AppState, ServiceInfo};
