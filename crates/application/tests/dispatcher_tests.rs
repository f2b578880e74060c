use application::{DispatchError, JobDispatcher, PrinterLink};
use domain::PrinterAddress;
use infrastructure::MockTransport;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn start_dispatcher(
    transport: &MockTransport,
) -> (JobDispatcher, JoinHandle<()>, CancellationToken) {
    let link = Arc::new(PrinterLink::new(
        Some(PrinterAddress::new("AA:BB:CC:DD:EE:FF").unwrap()),
        Arc::new(transport.clone()),
    ));
    let cancel = CancellationToken::new();
    let (dispatcher, worker) = JobDispatcher::new(link, cancel.clone());
    (dispatcher, tokio::spawn(worker.run()), cancel)
}

async fn wait_for_writes(transport: &MockTransport, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.write_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Timed out waiting for printer writes");
}

#[tokio::test]
async fn test_submit_returns_before_write() {
    let transport = MockTransport::new();
    transport.set_write_delay(Duration::from_millis(100));
    let (dispatcher, _worker, _cancel) = start_dispatcher(&transport);

    dispatcher.submit(b"^XA^XZ".to_vec()).unwrap();
    assert_eq!(transport.write_count(), 0);

    wait_for_writes(&transport, 1).await;
    assert_eq!(transport.writes(), vec![b"^XA^XZ".to_vec()]);
}

#[tokio::test]
async fn test_every_submission_written_exactly_once() {
    const JOBS: usize = 20;
    let transport = MockTransport::new();
    transport.set_write_delay(Duration::from_millis(2));
    let (dispatcher, _worker, _cancel) = start_dispatcher(&transport);

    let mut ids = HashSet::new();
    for i in 0..JOBS {
        let id = dispatcher.submit(format!("label-{}", i).into_bytes()).unwrap();
        assert!(ids.insert(id), "submission ids must be unique");
    }

    wait_for_writes(&transport, JOBS).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let written: HashSet<Vec<u8>> = transport.writes().into_iter().collect();
    let expected: HashSet<Vec<u8>> = (0..JOBS)
        .map(|i| format!("label-{}", i).into_bytes())
        .collect();
    assert_eq!(transport.write_count(), JOBS);
    assert_eq!(written, expected);
    assert_eq!(transport.max_concurrent_writers(), 1);
}

#[tokio::test]
async fn test_failed_job_does_not_stop_worker() {
    let transport = MockTransport::new();
    transport.fail_next_connects(1);
    let (dispatcher, _worker, _cancel) = start_dispatcher(&transport);

    dispatcher.submit(b"a".to_vec()).unwrap();
    dispatcher.submit(b"b".to_vec()).unwrap();
    wait_for_writes(&transport, 1).await;

    // Whichever job connected first was dropped; the other went through
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.write_count(), 1);
    assert_eq!(transport.connected_addresses().len(), 2);

    dispatcher.submit(b"c".to_vec()).unwrap();
    wait_for_writes(&transport, 2).await;
    assert!(dispatcher.is_running());
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_jobs() {
    let transport = MockTransport::new();
    transport.set_write_delay(Duration::from_secs(60));
    let (dispatcher, worker, cancel) = start_dispatcher(&transport);

    for _ in 0..3 {
        dispatcher.submit(b"^XA^XZ".to_vec()).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("worker must stop promptly on cancel")
        .unwrap();

    assert_eq!(transport.write_count(), 0);
    assert!(!dispatcher.is_running());
    assert_eq!(
        dispatcher.submit(b"late".to_vec()),
        Err(DispatchError::Stopped)
    );
}

#[tokio::test]
async fn test_dropping_handles_drains_queued_jobs() {
    let transport = MockTransport::new();
    transport.set_write_delay(Duration::from_millis(10));
    let (dispatcher, worker, _cancel) = start_dispatcher(&transport);

    for i in 0..3 {
        dispatcher.submit(vec![b'0' + i]).unwrap();
    }
    drop(dispatcher);

    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transport.write_count(), 3);
}

#[tokio::test]
async fn test_clones_share_one_queue() {
    let transport = MockTransport::new();
    let (dispatcher, _worker, _cancel) = start_dispatcher(&transport);
    let other = dispatcher.clone();

    dispatcher.submit(b"one".to_vec()).unwrap();
    other.submit(b"two".to_vec()).unwrap();

    wait_for_writes(&transport, 2).await;
    assert_eq!(transport.connect_count(), 1);
}
