pub mod dispatcher;
pub mod link;

pub use dispatcher::{DispatchError, DispatchWorker, JobDispatcher};
pub use link::{LinkTimeouts, PrinterLink};
