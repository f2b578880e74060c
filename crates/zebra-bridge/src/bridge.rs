use application::{JobDispatcher, LinkTimeouts, PrinterLink};
use domain::{ConfigProvider, PrinterAddress, PrinterTransport};
use infrastructure::BridgeConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api;
use crate::state::{AppState, ServiceInfo};

/// How long `stop` waits for open HTTP connections to finish
const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Bridge is already running")]
    AlreadyRunning,

    #[error("Failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub bind_host: String,
    pub port: u16,
    pub service_name: String,
    pub printer_name: String,
    pub max_body_bytes: usize,
    pub timeouts: LinkTimeouts,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for BridgeSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            bind_host: config.http.bind_host.clone(),
            port: config.http.port,
            service_name: config.service_name.clone(),
            printer_name: config.printer.name.clone(),
            max_body_bytes: config.http.max_body_bytes,
            timeouts: LinkTimeouts {
                connect: Duration::from_millis(config.printer.connect_timeout_ms),
                write: Duration::from_millis(config.printer.write_timeout_ms),
            },
        }
    }
}

struct Running {
    local_addr: SocketAddr,
    link: Arc<PrinterLink>,
    shutdown: CancellationToken,
    server: JoinHandle<()>,
    worker: JoinHandle<()>,
}

/// Wires the printer link, the job dispatcher and the HTTP listener
/// together and owns their lifetime.
pub struct BridgeCore {
    transport: Arc<dyn PrinterTransport>,
    settings: BridgeSettings,
    running: Option<Running>,
}

impl BridgeCore {
    pub fn new(transport: Arc<dyn PrinterTransport>, settings: BridgeSettings) -> Self {
        Self {
            transport,
            settings,
            running: None,
        }
    }

    /// Read the printer address once from `provider`, then start
    pub async fn start_with(
        &mut self,
        provider: &dyn ConfigProvider,
    ) -> Result<SocketAddr, BridgeError> {
        self.start(provider.configured_address()).await
    }

    /// Bind the HTTP listener and start serving.
    ///
    /// The printer is not contacted here; the first print job connects.
    pub async fn start(
        &mut self,
        address: Option<PrinterAddress>,
    ) -> Result<SocketAddr, BridgeError> {
        if self.running.is_some() {
            return Err(BridgeError::AlreadyRunning);
        }

        let bind_addr = format!("{}:{}", self.settings.bind_host, self.settings.port);
        let listener = TcpListener::bind((self.settings.bind_host.as_str(), self.settings.port))
            .await
            .map_err(|source| BridgeError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| BridgeError::Bind {
            addr: bind_addr,
            source,
        })?;

        match &address {
            Some(address) => info!(%address, "🖨️ Printer configured"),
            None => warn!("⚠️ No printer address configured. Print jobs will fail until one is set"),
        }

        let link = Arc::new(PrinterLink::with_timeouts(
            address,
            self.transport.clone(),
            self.settings.timeouts,
        ));
        let shutdown = CancellationToken::new();

        let (dispatcher, worker) = JobDispatcher::new(link.clone(), shutdown.child_token());
        let worker = tokio::spawn(worker.run());

        let state = AppState::new(
            link.clone(),
            dispatcher,
            self.settings.printer_name.as_str(),
            ServiceInfo::new(self.settings.service_name.clone(), local_addr.port()),
            self.settings.max_body_bytes,
        );
        let app = api::create_router(state);

        let server_token = shutdown.clone();
        let server = tokio::spawn(async move {
            let graceful = server_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { graceful.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "❌ HTTP server failed");
                // Wake whoever waits on the shutdown token
                server_token.cancel();
            }
        });

        info!("🚀 Zebra bridge listening on http://{}", local_addr);
        self.running = Some(Running {
            local_addr,
            link,
            shutdown,
            server,
            worker,
        });
        Ok(local_addr)
    }

    /// Stop listening, abort pending print jobs and close the printer
    /// connection. Does nothing if the bridge is not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("Stop requested but bridge is not running");
            return;
        };

        info!("🛑 Stopping Zebra bridge...");
        running.shutdown.cancel();

        if let Err(e) = running.worker.await {
            warn!(error = %e, "Print dispatcher task ended abnormally");
        }

        let mut server = running.server;
        match tokio::time::timeout(SERVER_DRAIN_TIMEOUT, &mut server).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "HTTP server task ended abnormally"),
            Err(_) => {
                warn!("HTTP connections still open after shutdown. Aborting server");
                server.abort();
            }
        }

        running.link.disconnect().await;
        info!("✅ Zebra bridge stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Token cancelled when the bridge stops or the HTTP server fails
    pub fn shutdown_token(&self) -> Option<CancellationToken> {
        self.running.as_ref().map(|r| r.shutdown.clone())
    }

    pub fn link(&self) -> Option<Arc<PrinterLink>> {
        self.running.as_ref().map(|r| r.link.clone())
    }
}
