//! # Session Tests
//!
//! The full session against the in-memory adapter: connection lifecycle,
//! chunked writes, acknowledgments and the event stream.

use std::sync::Arc;
use std::time::Duration;

use bonprint::connection::{AdapterState, BondState, ConnectionState, DeviceId, DiscoveredDevice};
use bonprint::document::*;
use bonprint::pipeline;
use bonprint::printer::config::MAJOR_CLASS_IMAGING;
use bonprint::printer::{AbsoluteFontSize, PrinterProfile};
use bonprint::transport::{MemoryAdapter, MemoryLog};
use bonprint::writer::ChunkedWriter;
use bonprint::{BonprintError, LinkEvent, PrinterEvent, Session, SessionOptions};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::UnboundedReceiver;

const WAIT: Duration = Duration::from_secs(5);

fn printer(id: &str) -> DiscoveredDevice {
    DiscoveredDevice::new(id, format!("Printer {}", id), MAJOR_CLASS_IMAGING)
}

async fn next_event(events: &mut UnboundedReceiver<PrinterEvent>) -> PrinterEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream closed")
}

fn receipt() -> Vec<PrintElement> {
    vec![
        Title::new("Order 42").into(),
        Separator::default().into(),
        LeftRight::new("Tea x2", "6.00").into(),
        LeftRight::new("Total", "6.00").into(),
    ]
}

/// Options for tests that drive discovery themselves.
fn manual() -> SessionOptions {
    SessionOptions {
        scan_on_open: false,
        ..SessionOptions::default()
    }
}

fn expected_bytes(elements: &[PrintElement]) -> Vec<u8> {
    pipeline::render(elements, AbsoluteFontSize::S0, &PrinterProfile::default())
}

/// A session connected to bonded printer "A".
async fn connected(adapter: MemoryAdapter) -> (Session, UnboundedReceiver<PrinterEvent>, MemoryLog) {
    let adapter = adapter.with_bonded(printer("A"));
    let log = adapter.log();
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(manual()).unwrap();
    session.connect_by_address("A").unwrap();

    match next_event(&mut events).await {
        PrinterEvent::DeviceConnected(device) => assert_eq!(device.address, "A"),
        other => panic!("expected device-connected, got {:?}", other),
    }
    assert!(session.is_connected());
    (session, events, log)
}

// ============================================================================
// PRINTING
// ============================================================================

#[tokio::test]
async fn test_print_writes_chunks_and_reports_success() {
    let (session, mut events, log) = connected(MemoryAdapter::new()).await;
    let elements = receipt();

    session.print(&elements).await.unwrap();

    assert_eq!(next_event(&mut events).await, PrinterEvent::PrintSuccess);
    let expected = expected_bytes(&elements);
    assert_eq!(log.bytes(), expected);
    let chunks = log.chunks();
    assert_eq!(chunks.len(), ChunkedWriter::new(32).chunk_count(expected.len()));
    assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 32));
}

#[tokio::test]
async fn test_print_while_disconnected_sends_nothing() {
    let adapter = MemoryAdapter::new();
    let log = adapter.log();
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(manual()).unwrap();

    let err = session.print(&receipt()).await.unwrap_err();
    assert!(matches!(err, BonprintError::NotReady(_)));
    assert!(matches!(
        next_event(&mut events).await,
        PrinterEvent::PrintFailure { .. }
    ));
    assert!(log.chunks().is_empty());
}

#[tokio::test]
async fn test_empty_print_succeeds_without_bytes() {
    let (session, mut events, log) = connected(MemoryAdapter::new()).await;

    session.print(&[]).await.unwrap();

    assert_eq!(next_event(&mut events).await, PrinterEvent::PrintSuccess);
    assert!(log.chunks().is_empty());
}

#[tokio::test]
async fn test_malformed_descriptors_fail_before_transport() {
    let (session, _events, log) = connected(MemoryAdapter::new()).await;

    let err = session.print_descriptors(r#"[{"type": "Title"}]"#).await.unwrap_err();
    assert!(matches!(err, BonprintError::InvalidInput(_)));
    assert!(log.chunks().is_empty());
}

#[tokio::test]
async fn test_print_descriptors() {
    let (session, mut events, log) = connected(MemoryAdapter::new()).await;

    session
        .print_descriptors(r#"[{"type": "LeftRight", "left": "Total", "right": "12.00"}]"#)
        .await
        .unwrap();

    assert_eq!(next_event(&mut events).await, PrinterEvent::PrintSuccess);
    assert_eq!(
        log.bytes(),
        expected_bytes(&[LeftRight::new("Total", "12.00").into()])
    );
}

#[tokio::test]
async fn test_write_failure_reports_print_failure() {
    let (session, mut events, _log) = connected(MemoryAdapter::new().fail_chunk(1)).await;

    let err = session.print(&receipt()).await.unwrap_err();
    assert!(matches!(err, BonprintError::TransportFault { .. }));
    match next_event(&mut events).await {
        PrinterEvent::PrintFailure { title, .. } => assert_eq!(title, "Print failed"),
        other => panic!("expected print-failure, got {:?}", other),
    }
    // The link survives a failed write
    assert!(session.is_connected());
}

// ============================================================================
// ACKNOWLEDGED LINKS
// ============================================================================

#[tokio::test]
async fn test_acknowledged_write_completes_on_last_ack() {
    let (session, mut events, log) = connected(MemoryAdapter::new().acknowledged()).await;
    let elements = receipt();
    let chunks = ChunkedWriter::new(32).chunk_count(expected_bytes(&elements).len());

    let job = session.submit(&elements).unwrap();
    assert!(log.wait_for_chunks(chunks, WAIT));

    // A second print while the first is unconfirmed is rejected
    assert!(matches!(
        session.submit(&elements),
        Err(BonprintError::NotReady(_))
    ));

    for _ in 0..chunks {
        session.handle_event(LinkEvent::WriteConfirmed { ok: true });
    }
    job.wait().await.unwrap();
    assert_eq!(next_event(&mut events).await, PrinterEvent::PrintSuccess);
}

#[tokio::test]
async fn test_rejected_write_ignores_its_late_confirmations() {
    let adapter = MemoryAdapter::new().acknowledged().paced();
    let (session, mut events, log) = connected(adapter).await;
    let elements = receipt();
    let chunks = ChunkedWriter::new(32).chunk_count(expected_bytes(&elements).len());
    assert!(chunks > 3);

    let first = session.submit(&elements).unwrap();
    log.release(2);
    assert!(log.wait_for_chunks(2, WAIT));
    session.handle_event(LinkEvent::WriteConfirmed { ok: false });

    assert!(matches!(
        first.wait().await,
        Err(BonprintError::TransportFault { .. })
    ));
    assert!(matches!(
        next_event(&mut events).await,
        PrinterEvent::PrintFailure { .. }
    ));

    // The rejected job stops at the next chunk boundary
    let again: Vec<PrintElement> = vec![Left::new("again").into()];
    let second = session.submit(&again).unwrap();
    log.release(chunks);
    assert!(log.wait_for_chunk(&expected_bytes(&again), WAIT));
    let abandoned = log.chunks().len() - 1;
    assert!(abandoned < chunks);

    // Replies still owed for the rejected job do not touch the second one
    for _ in 1..abandoned {
        session.handle_event(LinkEvent::WriteConfirmed { ok: false });
    }
    assert!(events.try_recv().is_err());

    session.handle_event(LinkEvent::WriteConfirmed { ok: true });
    second.wait().await.unwrap();
    assert_eq!(next_event(&mut events).await, PrinterEvent::PrintSuccess);
}

#[tokio::test]
async fn test_disconnect_stops_issuing_chunks() {
    let adapter = MemoryAdapter::new().acknowledged().paced();
    let (session, _events, log) = connected(adapter).await;
    let elements = receipt();
    let chunks = ChunkedWriter::new(32).chunk_count(expected_bytes(&elements).len());

    let job = session.submit(&elements).unwrap();
    log.release(1);
    assert!(log.wait_for_chunks(1, WAIT));
    session.disconnect().unwrap();
    log.release(chunks);

    assert!(matches!(
        job.wait().await,
        Err(BonprintError::TransportFault { .. })
    ));
    assert!(log.wait_for_closes(1, WAIT));
    assert!(log.chunks().len() <= 2);
}

#[tokio::test]
async fn test_disconnect_cancels_pending_print_silently() {
    let (session, mut events, log) = connected(MemoryAdapter::new().acknowledged()).await;

    let job = session.submit(&receipt()).unwrap();
    session.disconnect().unwrap();

    match job.wait().await {
        Err(BonprintError::TransportFault { description, .. }) => {
            assert_eq!(description, "cancelled")
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert!(matches!(
        next_event(&mut events).await,
        PrinterEvent::DeviceDisconnected(_)
    ));
    assert!(log.wait_for_closes(1, WAIT));
    assert!(events.try_recv().is_err());
    assert_eq!(session.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_link_lost_fails_pending_print() {
    let (session, mut events, _log) = connected(MemoryAdapter::new().acknowledged()).await;

    let job = session.submit(&receipt()).unwrap();
    session.handle_event(LinkEvent::LinkClosed(DeviceId::from("A")));

    assert!(matches!(
        next_event(&mut events).await,
        PrinterEvent::DeviceDisconnected(_)
    ));
    assert!(matches!(
        next_event(&mut events).await,
        PrinterEvent::PrintFailure { .. }
    ));
    assert!(matches!(
        job.wait().await,
        Err(BonprintError::TransportFault { .. })
    ));
    assert!(!session.is_connected());
}

// ============================================================================
// CONNECTION LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_connect_is_idempotent() {
    let (session, mut events, log) = connected(MemoryAdapter::new()).await;

    session.connect_by_address("A").unwrap();
    session.connect_by_address("A").unwrap();

    assert_eq!(log.opened(), vec![DeviceId::from("A")]);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_switch_device_orders_events() {
    let adapter = MemoryAdapter::new().with_bonded(printer("B"));
    let (session, mut events, log) = connected(adapter).await;

    session.connect_by_address("B").unwrap();

    match next_event(&mut events).await {
        PrinterEvent::DeviceDisconnected(device) => assert_eq!(device.address, "A"),
        other => panic!("expected device-disconnected, got {:?}", other),
    }
    match next_event(&mut events).await {
        PrinterEvent::DeviceConnected(device) => assert_eq!(device.address, "B"),
        other => panic!("expected device-connected, got {:?}", other),
    }
    assert_eq!(log.opened(), vec![DeviceId::from("A"), DeviceId::from("B")]);
    assert_eq!(log.closed(), vec![DeviceId::from("A")]);
    assert_eq!(session.state(), ConnectionState::Connected(DeviceId::from("B")));
}

#[tokio::test]
async fn test_disconnect_while_idle_is_silent() {
    let (session, mut events) = Session::new(Arc::new(MemoryAdapter::new()));
    session.open(manual()).unwrap();

    session.disconnect().unwrap();

    assert!(events.try_recv().is_err());
    assert_eq!(session.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_connect_unknown_device() {
    let (session, _events) = Session::new(Arc::new(MemoryAdapter::new()));
    session.open(manual()).unwrap();

    assert!(matches!(
        session.connect_by_address("Z"),
        Err(BonprintError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_open_failure_reports_connect_failed() {
    let adapter = MemoryAdapter::new()
        .with_bonded(printer("A"))
        .fail_open("page timeout");
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(manual()).unwrap();
    session.connect_by_address("A").unwrap();

    assert_eq!(
        next_event(&mut events).await,
        PrinterEvent::ConnectFailed {
            address: "A".into(),
            description: "page timeout".into(),
        }
    );
    assert_eq!(session.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_scan_bond_and_auto_connect() {
    let adapter = MemoryAdapter::new();
    let log = adapter.log();
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(manual()).unwrap();

    session.start_scan().unwrap();
    assert_eq!(session.state(), ConnectionState::Discovering);
    assert_eq!(log.discovery_starts(), 1);

    // A phone is listed but not connected to
    session.handle_event(LinkEvent::DeviceFound(DiscoveredDevice::new(
        "P", "Phone", 0x0200,
    )));
    assert!(matches!(next_event(&mut events).await, PrinterEvent::DeviceFound(_)));

    session.handle_event(LinkEvent::DeviceFound(printer("A")));
    assert!(matches!(next_event(&mut events).await, PrinterEvent::DeviceFound(_)));
    assert_eq!(session.state(), ConnectionState::Bonding(DeviceId::from("A")));
    assert_eq!(log.bond_requests(), vec![DeviceId::from("A")]);

    session.handle_event(LinkEvent::BondStateChanged {
        id: DeviceId::from("A"),
        state: BondState::Bonded,
    });
    assert!(matches!(next_event(&mut events).await, PrinterEvent::DeviceBonded(_)));
    assert!(matches!(next_event(&mut events).await, PrinterEvent::DeviceConnected(_)));

    assert!(session.is_connected());
    assert_eq!(session.devices().len(), 2);
    // Discovery stops once a printer is connected
    assert!(log.discovery_cancels() >= 2);
}

#[tokio::test]
async fn test_scan_without_discovery_is_silent() {
    let adapter = MemoryAdapter::new().without_discovery();
    let log = adapter.log();
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(manual()).unwrap();

    session.start_scan().unwrap();

    assert_eq!(session.state(), ConnectionState::Idle);
    assert_eq!(log.discovery_starts(), 0);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_connect_ignores_mac_case() {
    let adapter = MemoryAdapter::new().with_bonded(printer("66:22:B3:1C:07:9A"));
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(manual()).unwrap();

    session.connect_by_address("66:22:b3:1c:07:9a").unwrap();

    match next_event(&mut events).await {
        PrinterEvent::DeviceConnected(device) => assert_eq!(device.address, "66:22:B3:1C:07:9A"),
        other => panic!("expected device-connected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_open_scans_and_auto_connects() {
    let adapter = MemoryAdapter::new();
    let log = adapter.log();
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(SessionOptions::default()).unwrap();

    assert_eq!(log.discovery_starts(), 1);
    assert_eq!(session.state(), ConnectionState::Discovering);

    session.handle_event(LinkEvent::DeviceFound(printer("A").bonded()));
    assert!(matches!(next_event(&mut events).await, PrinterEvent::DeviceFound(_)));
    assert!(matches!(next_event(&mut events).await, PrinterEvent::DeviceConnected(_)));
    assert_eq!(log.opened(), vec![DeviceId::from("A")]);
}

#[tokio::test]
async fn test_scan_while_off_requests_enable() {
    let adapter = MemoryAdapter::new().disabled();
    let log = adapter.log();
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(manual()).unwrap();

    session.start_scan().unwrap();
    assert_eq!(log.enable_requests(), 1);
    assert_eq!(log.discovery_starts(), 0);
    assert_eq!(session.state(), ConnectionState::Idle);

    session.handle_event(LinkEvent::AdapterStateChanged(AdapterState::On));
    assert_eq!(next_event(&mut events).await, PrinterEvent::BluetoothReady);
    assert_eq!(log.discovery_starts(), 1);
    assert_eq!(session.state(), ConnectionState::Discovering);
}

#[tokio::test]
async fn test_open_rejects_unusable_profile() {
    let (session, _events) = Session::new(Arc::new(MemoryAdapter::new()));
    let options = SessionOptions {
        profile: PrinterProfile {
            line_budget: 0,
            ..PrinterProfile::default()
        },
        ..manual()
    };

    assert!(matches!(session.open(options), Err(BonprintError::InvalidInput(_))));
    assert!(matches!(session.start_scan(), Err(BonprintError::NotReady(_))));
}

#[tokio::test]
async fn test_close_disconnects() {
    let (session, mut events, log) = connected(MemoryAdapter::new()).await;

    session.close();

    assert!(matches!(
        next_event(&mut events).await,
        PrinterEvent::DeviceDisconnected(_)
    ));
    assert_eq!(log.closed(), vec![DeviceId::from("A")]);
    assert!(!session.is_connected());
    assert!(matches!(
        session.connect_by_address("A"),
        Err(BonprintError::NotReady(_))
    ));
}
