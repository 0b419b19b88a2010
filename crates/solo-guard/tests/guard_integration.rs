//! Integration tests for the probe/response liveness protocol.
//!
//! These run over real loopback UDP sockets. Every test uses its own port
//! (spaced by ten - the prober binds port + 1) so tests can run in
//! parallel without cross-talk.
//!
//! Tests CAN use `.unwrap()` and `.expect()`; the panic-free policy applies
//! to production code only.

use std::time::{Duration, Instant};

use solo_core::{InstanceId, ProbeConfig, Scope};
use solo_guard::{probe_for_existing_instance, InstanceGuard, Responder};
use solo_protocol::DiscoveryMessage;
use tokio::net::UdpSocket;

// ============================================================================
// Constants
// ============================================================================

/// Default probe timeout for tests that should resolve fast.
const SHORT_TIMEOUT: Duration = Duration::from_millis(300);

/// Scheduling slack allowed on top of a timeout before a test is failed.
const SCHEDULING_SLACK: Duration = Duration::from_millis(1_500);

// ============================================================================
// Test Helpers
// ============================================================================

fn local_config(port: u16, timeout: Duration) -> ProbeConfig {
    ProbeConfig::new(Scope::LocalOnly, port, timeout).expect("valid test config")
}

/// Binds the discovery port directly and answers the first probe with a
/// response carrying an arbitrary identity. Stands in for a legacy or
/// misbehaving responder.
async fn reply_once_with(port: u16, reply_identity: &str) -> tokio::task::JoinHandle<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await.expect("bind fake responder");
    let reply = DiscoveryMessage::response(reply_identity).encode();

    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        if let Ok((_, peer)) = socket.recv_from(&mut buf).await {
            let _ = socket.send_to(reply.as_bytes(), peer).await;
        }
    })
}

// ============================================================================
// P1 / E2E scenario A: matching responder is detected
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn matching_probe_detects_running_instance() {
    let identity = InstanceId::new("G1");
    let config = local_config(47_010, Duration::from_millis(500));

    let mut responder = Responder::new(identity.clone(), config.clone())
        .start()
        .expect("start responder");

    let start = Instant::now();
    let first = probe_for_existing_instance(&identity, &config).await;

    assert!(!first, "prober must conclude duplicate instance");
    assert!(
        start.elapsed() < Duration::from_millis(500) + SCHEDULING_SLACK,
        "match must resolve within the timeout window"
    );

    responder.stop().await;
}

// ============================================================================
// P2 / E2E scenario C: identity mismatch is isolation, not a match
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_identity_gets_no_reply() {
    let config = local_config(47_020, SHORT_TIMEOUT);

    let mut responder = Responder::new(InstanceId::new("G1"), config.clone())
        .start()
        .expect("start responder");

    let start = Instant::now();
    let first = probe_for_existing_instance(&InstanceId::new("G3"), &config).await;

    assert!(first, "responder for G1 must not answer a probe for G3");
    assert!(
        start.elapsed() >= SHORT_TIMEOUT,
        "absence must take the full timeout"
    );

    responder.stop().await;
}

// ============================================================================
// P3 / E2E scenario B: timeout lower and upper bound
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn timeout_bounds_with_no_responder() {
    let timeout = Duration::from_millis(200);
    let config = local_config(47_030, timeout);

    let start = Instant::now();
    let first = probe_for_existing_instance(&InstanceId::new("G2"), &config).await;
    let elapsed = start.elapsed();

    assert!(first, "no responder means first instance");
    assert!(
        elapsed >= timeout,
        "must not conclude before the timeout elapses (took {elapsed:?})"
    );
    assert!(
        elapsed < timeout + SCHEDULING_SLACK,
        "must conclude within scheduling slack of the timeout (took {elapsed:?})"
    );
}

// ============================================================================
// P4: idempotent shutdown
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn stop_twice_releases_port_once() {
    let config = local_config(47_040, SHORT_TIMEOUT);
    let identity = InstanceId::new("G4");

    let mut handle = Responder::new(identity.clone(), config.clone())
        .start()
        .expect("start responder");

    handle.stop().await;
    handle.stop().await;
    assert!(handle.is_stopped());

    // The port is genuinely free again: a fresh responder starts and answers.
    let mut next = Responder::new(identity.clone(), config.clone())
        .start()
        .expect("rebind after release");
    assert!(!probe_for_existing_instance(&identity, &config).await);
    next.stop().await;
}

// ============================================================================
// P5: malformed traffic tolerance
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn malformed_datagrams_do_not_kill_the_loop() {
    let identity = InstanceId::new("G1");
    let config = local_config(47_050, Duration::from_millis(500));

    let mut responder = Responder::new(identity.clone(), config.clone())
        .start()
        .expect("start responder");

    // Arbitrary non-protocol bytes, including invalid UTF-8.
    let noise = UdpSocket::bind("127.0.0.1:0").await.expect("bind noise socket");
    for payload in [&b"\xff\xfe\x00garbage"[..], b"", b"GET / HTTP/1.1", b"Probe"] {
        noise
            .send_to(payload, ("127.0.0.1", config.port()))
            .await
            .expect("send noise");
    }

    // No reply may be produced for any of it.
    let mut buf = [0u8; 1024];
    let unexpected =
        tokio::time::timeout(Duration::from_millis(200), noise.recv_from(&mut buf)).await;
    assert!(unexpected.is_err(), "noise must not be answered");

    // A well-formed matching probe afterwards still gets its response.
    assert!(!probe_for_existing_instance(&identity, &config).await);

    responder.stop().await;
}

// ============================================================================
// Single receive attempt holds the original deadline
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn wrong_identity_reply_does_not_shorten_the_window() {
    let config = local_config(47_060, SHORT_TIMEOUT);

    // A responder that answers immediately, but for the wrong application.
    let fake = reply_once_with(config.port(), "SOMEONE-ELSE").await;

    let start = Instant::now();
    let first = probe_for_existing_instance(&InstanceId::new("G5"), &config).await;
    let elapsed = start.elapsed();

    assert!(first, "a mismatched response is not a match");
    assert!(
        elapsed >= SHORT_TIMEOUT,
        "prober must hold until the original deadline (took {elapsed:?})"
    );

    fake.abort();
}

// ============================================================================
// Guard lifecycle end to end
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn guard_lifecycle_first_then_duplicate() {
    let identity = InstanceId::new("G6");
    let config = local_config(47_070, SHORT_TIMEOUT);

    let mut winner = InstanceGuard::acquire(identity.clone(), config.clone())
        .await
        .expect("acquire winner");
    assert!(winner.is_first_instance());

    let mut loser = InstanceGuard::acquire(identity.clone(), config.clone())
        .await
        .expect("acquire duplicate");
    assert!(!loser.is_first_instance());

    // Duplicate shutdown is a no-op; winner shutdown releases the port.
    loser.shutdown().await;
    winner.shutdown().await;
    winner.shutdown().await;

    // With the winner gone, the next arrival is first again.
    let mut successor = InstanceGuard::acquire(identity, config)
        .await
        .expect("acquire successor");
    assert!(successor.is_first_instance());
    successor.shutdown().await;
}

// ============================================================================
// Network-wide scope fails open
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn network_wide_probe_without_responder_is_first() {
    // Broadcast may be unroutable in constrained environments; either the
    // timeout or the transport fault path must resolve to first instance.
    let config = ProbeConfig::new(Scope::NetworkWide, 47_080, Duration::from_millis(200))
        .expect("valid config");

    assert!(probe_for_existing_instance(&InstanceId::new("G7"), &config).await);
}
