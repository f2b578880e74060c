//! Application layer - Printer session and print job workflows

pub mod printer;

pub use printer::{DispatchError, DispatchWorker, JobDispatcher, LinkTimeouts, PrinterLink};
