use application::{LinkTimeouts, PrinterLink};
use async_trait::async_trait;
use domain::{
    ConnectError, ConnectionState, PrinterAddress, PrinterStream, PrinterTransport, WriteError,
};
use infrastructure::MockTransport;
use std::sync::Arc;
use std::time::Duration;

const MAC: &str = "AA:BB:CC:DD:EE:FF";

fn link_with(transport: &MockTransport) -> PrinterLink {
    PrinterLink::new(
        Some(PrinterAddress::new(MAC).unwrap()),
        Arc::new(transport.clone()),
    )
}

/// Transport whose connect never completes
struct HangingTransport;

#[async_trait]
impl PrinterTransport for HangingTransport {
    async fn connect(
        &self,
        _address: &PrinterAddress,
    ) -> Result<Box<dyn PrinterStream>, ConnectError> {
        std::future::pending().await
    }

    fn connection_kind(&self) -> &'static str {
        "bluetooth"
    }
}

#[tokio::test]
async fn test_connects_lazily_on_first_send() {
    let transport = MockTransport::new();
    let link = link_with(&transport);

    assert_eq!(link.current_state(), ConnectionState::Disconnected);
    assert_eq!(transport.connect_count(), 0);

    link.send_bytes(b"^XA^FDfirst^FS^XZ").await.unwrap();

    assert_eq!(link.current_state(), ConnectionState::Connected);
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(transport.writes(), vec![b"^XA^FDfirst^FS^XZ".to_vec()]);
    assert_eq!(
        transport.connected_addresses(),
        vec![PrinterAddress::new(MAC).unwrap()]
    );
}

#[tokio::test]
async fn test_reuses_live_connection() {
    let transport = MockTransport::new();
    let link = link_with(&transport);

    link.ensure_connected().await.unwrap();
    link.ensure_connected().await.unwrap();
    link.send_bytes(b"one").await.unwrap();
    link.send_bytes(b"two").await.unwrap();

    assert_eq!(transport.connect_count(), 1);
    assert_eq!(transport.write_count(), 2);
}

#[tokio::test]
async fn test_state_transitions_are_published() {
    let transport = MockTransport::new();
    let link = link_with(&transport);
    let mut states = link.subscribe();

    link.ensure_connected().await.unwrap();
    // The receiver only keeps the latest value
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), ConnectionState::Connected);

    link.disconnect().await;
    assert_eq!(*states.borrow_and_update(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_unconfigured_printer() {
    let transport = MockTransport::new();
    let link = PrinterLink::new(None, Arc::new(transport.clone()));

    let err = link.ensure_connected().await.unwrap_err();
    assert_eq!(err, ConnectError::NotConfigured);

    let err = link.send_bytes(b"^XA^XZ").await.unwrap_err();
    assert_eq!(err, WriteError::Connect(ConnectError::NotConfigured));

    assert_eq!(link.current_state(), ConnectionState::Disconnected);
    assert!(transport.connected_addresses().is_empty());
}

#[tokio::test]
async fn test_connect_failure_then_recovery() {
    let transport = MockTransport::new();
    transport.fail_next_connects(1);
    let link = link_with(&transport);

    let err = link.send_bytes(b"lost").await.unwrap_err();
    assert!(err.is_connect_failure());
    assert!(matches!(err, WriteError::Connect(ConnectError::Unreachable(_))));
    assert_eq!(link.current_state(), ConnectionState::Failed);
    assert_eq!(transport.write_count(), 0);

    // No retry happened inside the failed call; the next one connects
    link.send_bytes(b"delivered").await.unwrap();
    assert_eq!(link.current_state(), ConnectionState::Connected);
    assert_eq!(transport.writes(), vec![b"delivered".to_vec()]);
    assert_eq!(transport.connected_addresses().len(), 2);
}

#[tokio::test]
async fn test_write_failure_drops_connection() {
    let transport = MockTransport::new();
    let link = link_with(&transport);
    link.send_bytes(b"first").await.unwrap();

    transport.fail_next_write();
    let err = link.send_bytes(b"second").await.unwrap_err();
    assert!(matches!(err, WriteError::Io(_)));
    assert!(!err.is_connect_failure());
    assert_eq!(link.current_state(), ConnectionState::Disconnected);
    assert_eq!(transport.close_count(), 1);

    link.send_bytes(b"third").await.unwrap();
    assert_eq!(transport.connect_count(), 2);
    assert_eq!(transport.writes(), vec![b"first".to_vec(), b"third".to_vec()]);
}

#[tokio::test]
async fn test_stale_stream_is_replaced() {
    let transport = MockTransport::new();
    let link = link_with(&transport);
    link.send_bytes(b"before").await.unwrap();

    transport.drop_link();
    link.send_bytes(b"after").await.unwrap();

    assert_eq!(transport.connect_count(), 2);
    assert_eq!(transport.close_count(), 1);
    assert_eq!(link.current_state(), ConnectionState::Connected);
    assert_eq!(transport.writes(), vec![b"before".to_vec(), b"after".to_vec()]);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let transport = MockTransport::new();
    let link = link_with(&transport);

    link.disconnect().await;
    assert_eq!(link.current_state(), ConnectionState::Disconnected);

    link.ensure_connected().await.unwrap();
    link.disconnect().await;
    link.disconnect().await;

    assert_eq!(link.current_state(), ConnectionState::Disconnected);
    assert_eq!(transport.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout() {
    let link = PrinterLink::with_timeouts(
        Some(PrinterAddress::new(MAC).unwrap()),
        Arc::new(HangingTransport),
        LinkTimeouts {
            connect: Duration::from_secs(10),
            write: Duration::from_secs(30),
        },
    );

    let err = link.ensure_connected().await.unwrap_err();
    assert_eq!(err, ConnectError::Timeout(10_000));
    assert_eq!(link.current_state(), ConnectionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_write_timeout_drops_connection() {
    let transport = MockTransport::new();
    transport.set_write_delay(Duration::from_secs(120));
    let link = PrinterLink::with_timeouts(
        Some(PrinterAddress::new(MAC).unwrap()),
        Arc::new(transport.clone()),
        LinkTimeouts {
            connect: Duration::from_secs(10),
            write: Duration::from_secs(30),
        },
    );

    let err = link.send_bytes(b"^XA^XZ").await.unwrap_err();
    assert_eq!(err, WriteError::Timeout(30_000));
    assert_eq!(link.current_state(), ConnectionState::Disconnected);
    assert_eq!(transport.write_count(), 0);
}

#[tokio::test]
async fn test_state_readable_during_write() {
    let transport = MockTransport::new();
    transport.set_write_delay(Duration::from_millis(200));
    let link = Arc::new(link_with(&transport));

    let writer = {
        let link = link.clone();
        tokio::spawn(async move { link.send_bytes(b"slow").await })
    };

    let mut states = link.subscribe();
    states
        .wait_for(|state| *state == ConnectionState::Connected)
        .await
        .unwrap();
    // Write is still in progress and holds the session lock
    assert_eq!(transport.write_count(), 0);
    assert_eq!(link.current_state(), ConnectionState::Connected);

    writer.await.unwrap().unwrap();
    assert_eq!(transport.write_count(), 1);
}

#[tokio::test]
async fn test_concurrent_sends_never_interleave() {
    let transport = MockTransport::new();
    transport.set_write_delay(Duration::from_millis(5));
    let link = Arc::new(link_with(&transport));

    let mut handles = Vec::new();
    for i in 0..8 {
        let link = link.clone();
        handles.push(tokio::spawn(async move {
            link.send_bytes(format!("job-{}", i).as_bytes()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(transport.write_count(), 8);
    assert_eq!(transport.max_concurrent_writers(), 1);
    assert_eq!(transport.connect_count(), 1);
}
