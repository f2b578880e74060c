use async_trait::async_trait;
use domain::{ConnectError, PrinterAddress, PrinterStream, PrinterTransport};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// In-memory transport with fault injection.
///
/// Every `write_all` call is recorded as its own entry, so tests can count
/// writes as well as compare bytes.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    writes: Mutex<Vec<Vec<u8>>>,
    addresses: Mutex<Vec<PrinterAddress>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    failing_connects: AtomicUsize,
    fail_next_write: AtomicBool,
    write_delay_ms: AtomicU64,
    generation: AtomicU64,
    active_writers: AtomicUsize,
    max_concurrent_writers: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` connection attempts fail
    pub fn fail_next_connects(&self, count: usize) {
        self.state.failing_connects.store(count, Ordering::SeqCst);
    }

    /// Make the next write fail with a broken pipe
    pub fn fail_next_write(&self) {
        self.state.fail_next_write.store(true, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.state
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Simulate the printer going away: streams opened so far report closed
    pub fn drop_link(&self) {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of successful connects
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Payloads in arrival order, one entry per write
    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.state.writes).clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.state.writes).len()
    }

    /// Addresses passed to `connect`, including failed attempts
    pub fn connected_addresses(&self) -> Vec<PrinterAddress> {
        lock(&self.state.addresses).clone()
    }

    /// Highest number of writes observed in progress at the same time
    pub fn max_concurrent_writers(&self) -> usize {
        self.state.max_concurrent_writers.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl PrinterTransport for MockTransport {
    async fn connect(
        &self,
        address: &PrinterAddress,
    ) -> Result<Box<dyn PrinterStream>, ConnectError> {
        lock(&self.state.addresses).push(address.clone());

        let should_fail = self
            .state
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ConnectError::Unreachable(format!(
                "Simulated connection failure to {}",
                address
            )));
        }

        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            state: self.state.clone(),
            generation: self.state.generation.load(Ordering::SeqCst),
            closed: false,
        }))
    }

    fn connection_kind(&self) -> &'static str {
        "bluetooth"
    }
}

struct MockStream {
    state: Arc<MockState>,
    generation: u64,
    closed: bool,
}

#[async_trait]
impl PrinterStream for MockStream {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if !self.is_open() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "stream closed"));
        }
        if self.state.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "Simulated write failure",
            ));
        }

        let active = self.state.active_writers.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .max_concurrent_writers
            .fetch_max(active, Ordering::SeqCst);

        let delay = self.state.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        lock(&self.state.writes).push(bytes.to_vec());

        self.state.active_writers.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed && self.generation == self.state.generation.load(Ordering::SeqCst)
    }
}
