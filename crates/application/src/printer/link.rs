use domain::{
    ConnectError, ConnectionState, PrinterAddress, PrinterStream, PrinterTransport, WriteError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Upper bounds for printer I/O
#[derive(Debug, Clone, Copy)]
pub struct LinkTimeouts {
    pub connect: Duration,
    pub write: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            write: Duration::from_secs(30),
        }
    }
}

/// The single long-lived session to the configured printer.
///
/// Connects lazily on first use and after any write failure. Connect, write
/// and disconnect all run under one lock, so payloads from concurrent jobs
/// never interleave on the wire. The connection state is published through a
/// watch channel and can be read at any time without waiting for that lock.
pub struct PrinterLink {
    address: Option<PrinterAddress>,
    transport: Arc<dyn PrinterTransport>,
    timeouts: LinkTimeouts,
    session: Mutex<Option<Box<dyn PrinterStream>>>,
    state: watch::Sender<ConnectionState>,
}

impl PrinterLink {
    pub fn new(address: Option<PrinterAddress>, transport: Arc<dyn PrinterTransport>) -> Self {
        Self::with_timeouts(address, transport, LinkTimeouts::default())
    }

    pub fn with_timeouts(
        address: Option<PrinterAddress>,
        transport: Arc<dyn PrinterTransport>,
        timeouts: LinkTimeouts,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            address,
            transport,
            timeouts,
            session: Mutex::new(None),
            state,
        }
    }

    pub fn address(&self) -> Option<&PrinterAddress> {
        self.address.as_ref()
    }

    pub fn connection_kind(&self) -> &'static str {
        self.transport.connection_kind()
    }

    /// Snapshot of the connection state; never waits on printer I/O
    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open the stream unless a live one is already cached
    pub async fn ensure_connected(&self) -> Result<(), ConnectError> {
        let mut session = self.session.lock().await;
        let stream = self.take_connected(&mut session).await?;
        *session = Some(stream);
        Ok(())
    }

    /// Connect if needed, then write and flush the whole payload.
    ///
    /// A failed write tears the stream down; the next call starts from a
    /// fresh connect. Nothing is retried within this call.
    pub async fn send_bytes(&self, payload: &[u8]) -> Result<(), WriteError> {
        let mut session = self.session.lock().await;
        let mut stream = self.take_connected(&mut session).await?;

        match self.write_payload(stream.as_mut(), payload).await {
            Ok(()) => {
                debug!(bytes = payload.len(), "Payload written to printer");
                *session = Some(stream);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, bytes = payload.len(), "❌ Printer write failed. Dropping connection");
                self.close_stream(stream).await;
                self.advance(|state| Ok(state.to_disconnected()));
                Err(e)
            }
        }
    }

    /// Close the stream if one is open. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        if let Some(stream) = session.take() {
            self.close_stream(stream).await;
            info!("Disconnected from printer");
        }
        self.advance(|state| Ok(state.to_disconnected()));
    }

    async fn take_connected(
        &self,
        session: &mut Option<Box<dyn PrinterStream>>,
    ) -> Result<Box<dyn PrinterStream>, ConnectError> {
        let Some(address) = self.address.as_ref() else {
            warn!("Cannot connect - no printer configured");
            return Err(ConnectError::NotConfigured);
        };

        if let Some(stream) = session.take() {
            if stream.is_open() && self.current_state().is_connected() {
                return Ok(stream);
            }
            debug!(%address, "Discarding stale printer stream");
            self.close_stream(stream).await;
        }

        // A holder cancelled mid-operation can leave Connecting/Connected behind
        if !self.current_state().can_connect() {
            self.advance(|state| Ok(state.to_disconnected()));
        }
        self.advance(ConnectionState::to_connecting);

        info!(%address, kind = self.transport.connection_kind(), "🔌 Connecting to printer...");
        match timeout(self.timeouts.connect, self.transport.connect(address)).await {
            Ok(Ok(stream)) => {
                self.advance(ConnectionState::to_connected);
                info!(%address, "✅ Printer connected");
                Ok(stream)
            }
            Ok(Err(e)) => {
                self.advance(|state| Ok(state.to_failed()));
                error!(%address, error = %e, "❌ Failed to connect to printer");
                Err(e)
            }
            Err(_) => {
                self.advance(|state| Ok(state.to_failed()));
                let ms = self.timeouts.connect.as_millis() as u64;
                error!(%address, timeout_ms = ms, "❌ Printer connection timed out");
                Err(ConnectError::Timeout(ms))
            }
        }
    }

    async fn write_payload(
        &self,
        stream: &mut dyn PrinterStream,
        payload: &[u8],
    ) -> Result<(), WriteError> {
        let write = async {
            stream.write_all(payload).await?;
            stream.flush().await
        };

        match timeout(self.timeouts.write, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WriteError::Io(e.to_string())),
            Err(_) => Err(WriteError::Timeout(self.timeouts.write.as_millis() as u64)),
        }
    }

    async fn close_stream(&self, mut stream: Box<dyn PrinterStream>) {
        match timeout(self.timeouts.write, stream.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Error closing printer stream"),
            Err(_) => warn!("Timed out closing printer stream"),
        }
    }

    fn advance(
        &self,
        next: impl FnOnce(&ConnectionState) -> Result<ConnectionState, &'static str>,
    ) {
        self.state.send_if_modified(|state| match next(state) {
            Ok(new_state) if new_state != *state => {
                debug!(from = %state, to = %new_state, "Printer connection state changed");
                *state = new_state;
                true
            }
            Ok(_) => false,
            Err(reason) => {
                warn!(from = %state, reason, "Rejected connection state transition");
                false
            }
        });
    }
}
