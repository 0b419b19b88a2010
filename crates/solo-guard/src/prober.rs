//! Startup probe for an existing instance.
//!
//! One datagram out, at most one datagram in, bounded by the configured
//! response timeout. The prober never fails: a timeout is the definitive
//! signal of absence, and transport faults degrade to "first instance" -
//! wrongly allowing a duplicate is less harmful than wrongly blocking a
//! legitimate first launch.

use std::io;
use std::net::SocketAddr;

use solo_core::{InstanceId, ProbeConfig};
use solo_protocol::{DiscoveryMessage, MAX_DATAGRAM_LEN};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::socket::bind_probe_socket;

/// How a probe resolved, before collapsing to the public boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    /// A responder echoed our identity within the timeout.
    Matched,
    /// The deadline elapsed without a matching response.
    TimedOut,
    /// A send/receive fault ended the exchange early.
    TransportFault,
}

/// Sends one probe addressed to the configured scope and waits up to the
/// response timeout for a matching alive response.
///
/// Returns true when this process is the first instance. Emits exactly one
/// datagram and consumes at most one; the send socket is released when the
/// exchange resolves.
pub async fn probe_for_existing_instance(identity: &InstanceId, config: &ProbeConfig) -> bool {
    let outcome = match run_probe(identity, config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "Probe transport fault, assuming first instance");
            ProbeOutcome::TransportFault
        }
    };

    match outcome {
        ProbeOutcome::Matched => {
            info!(
                app = config.display_name(),
                "Already running, this is a duplicate instance"
            );
            false
        }
        ProbeOutcome::TimedOut | ProbeOutcome::TransportFault => true,
    }
}

async fn run_probe(identity: &InstanceId, config: &ProbeConfig) -> io::Result<ProbeOutcome> {
    let socket = bind_probe_socket(config.send_port(), config.scope().is_network_wide())?;

    let target = SocketAddr::new(config.scope().target_addr(), config.port());
    let probe = DiscoveryMessage::probe(identity.clone());
    socket.send_to(probe.encode().as_bytes(), target).await?;
    debug!(%target, identity = %identity, "Probe sent");

    let deadline = Instant::now() + config.response_timeout();
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    // Single receive attempt: the first datagram either matches or it does
    // not. Kept for wire compatibility with responders that predate looping
    // receives.
    let (len, peer) = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
        Err(_) => {
            debug!("No response within timeout");
            return Ok(ProbeOutcome::TimedOut);
        }
        Ok(result) => result?,
    };

    let matched = matches!(
        DiscoveryMessage::decode(buf.get(..len).unwrap_or_default()),
        Ok(DiscoveryMessage::Response(id)) if id == *identity
    );

    if matched {
        debug!(%peer, "Matching alive response");
        return Ok(ProbeOutcome::Matched);
    }

    // A non-matching datagram does not restart or shorten the wait window:
    // hold until the original deadline so absence always takes the full
    // timeout, stray traffic or not.
    debug!(%peer, "Discarding non-matching datagram");
    tokio::time::sleep_until(deadline).await;
    Ok(ProbeOutcome::TimedOut)
}
