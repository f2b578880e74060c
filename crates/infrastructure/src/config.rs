use config::{Config, ConfigError, Environment, File};
use domain::{ConfigProvider, PrinterAddress};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_HTTP_PORT: u16 = 9100;
pub const DEFAULT_SERVICE_NAME: &str = "ZebraBridge";
pub const DEFAULT_PRINTER_NAME: &str = "Zebra Bluetooth Printer";
pub const ENV_PREFIX: &str = "ZEBRA_BRIDGE";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Bluetooth serial profile through an RFCOMM TTY
    #[default]
    Rfcomm,
    /// Raw TCP port printing
    Tcp,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrinterSettings {
    /// Printer MAC (or device path / host:port, depending on transport)
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub transport: TransportKind,
    /// Display name reported on the discovery endpoints
    #[serde(default = "default_printer_name")]
    pub name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Port used when a TCP address has none
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_printer_name() -> String {
    DEFAULT_PRINTER_NAME.to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_tcp_port() -> u16 {
    9100
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_write_timeout_ms() -> u64 {
    30_000
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            address: None,
            transport: TransportKind::default(),
            name: default_printer_name(),
            baud_rate: default_baud_rate(),
            tcp_port: default_tcp_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpSettings {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Largest accepted print request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port: default_http_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BridgeConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub printer: PrinterSettings,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            http: HttpSettings::default(),
            printer: PrinterSettings::default(),
        }
    }
}

impl BridgeConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_from(config_dir, &run_mode, environment)
    }

    fn load_from(
        config_dir: &str,
        run_mode: &str,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Shared settings, e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Per-mode overrides, e.g. config/production.toml
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. ZEBRA_BRIDGE__PRINTER__ADDRESS=AA:BB:CC:DD:EE:FF)
            .add_source(environment)
            .build()?;

        s.try_deserialize()
    }
}

impl ConfigProvider for BridgeConfig {
    fn configured_address(&self) -> Option<PrinterAddress> {
        let raw = self.printer.address.as_deref()?;
        let address = PrinterAddress::new(raw).ok()?;

        if self.printer.transport == TransportKind::Rfcomm
            && !address.is_mac()
            && !address.as_str().starts_with('/')
        {
            warn!(%address, "Configured printer address is not a Bluetooth MAC (expected e.g. F4:60:77:45:E0:62)");
        }
        Some(address)
    }
}
