use application::{JobDispatcher, PrinterLink};
use std::sync::Arc;

/// Identity reported by the health endpoint
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub version: &'static str,
    pub port: u16,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION"),
            port,
        }
    }
}

/// Shared handler state. Cheap to clone; every request gets its own copy.
#[derive(Clone)]
pub struct AppState {
    pub link: Arc<PrinterLink>,
    pub dispatcher: JobDispatcher,
    pub printer_name: Arc<str>,
    pub service: Arc<ServiceInfo>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        link: Arc<PrinterLink>,
        dispatcher: JobDispatcher,
        printer_name: impl Into<Arc<str>>,
        service: ServiceInfo,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            link,
            dispatcher,
            printer_name: printer_name.into(),
            service: Arc::new(service),
            max_body_bytes,
        }
    }
}
