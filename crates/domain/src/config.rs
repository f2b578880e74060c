use crate::printer::PrinterAddress;

/// Source of the printer address chosen by the user
///
/// Read once when the bridge starts; the core never writes it back.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait ConfigProvider: Send + Sync {
    /// The configured printer, if any
    fn configured_address(&self) -> Option<PrinterAddress>;
}
