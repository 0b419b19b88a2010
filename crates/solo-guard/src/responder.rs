//! Alive-request responder.
//!
//! The winning instance binds the discovery port and answers probes that
//! carry its own identity until told to stop. The port is shared by design:
//! probes for other applications and outright garbage are expected traffic,
//! discarded without ceremony, and a failed reply never terminates the
//! loop. The only clean exit is cancellation.
//!
//! States: Stopped -> (start) -> Listening -> (stop | drop) -> Stopped.
//! The socket is owned by the spawned task and therefore released exactly
//! once, whichever path ends the loop.

use std::io;
use std::net::SocketAddr;

use solo_core::{InstanceId, ProbeConfig};
use solo_protocol::{DiscoveryMessage, MAX_DATAGRAM_LEN};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::socket::bind_responder_socket;

/// Errors that can occur starting the responder.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    /// The discovery port could not be bound
    #[error("Failed to bind discovery port {port}: {error}")]
    Bind { port: u16, error: io::Error },
}

/// Answers alive requests that carry this instance's identity.
pub struct Responder {
    identity: InstanceId,
    config: ProbeConfig,
}

impl Responder {
    /// Creates a responder in the Stopped state.
    #[must_use]
    pub fn new(identity: InstanceId, config: ProbeConfig) -> Self {
        Self { identity, config }
    }

    /// Binds the receive socket and spawns the receive loop.
    ///
    /// Consumes the responder: a running loop is owned by the returned
    /// handle, and "start while already listening" is unrepresentable -
    /// answering probes again means constructing a new responder.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ResponderError::Bind`] when the discovery port cannot be
    /// bound. Faults after startup are handled inside the loop and are
    /// never fatal.
    pub fn start(self) -> Result<ResponderHandle, ResponderError> {
        let port = self.config.port();
        let socket = bind_responder_socket(port).map_err(|error| ResponderError::Bind {
            port,
            error,
        })?;

        info!(
            port,
            app = self.config.display_name(),
            identity = %self.identity,
            "Responder listening for alive requests"
        );

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let identity = self.identity;
        let task = tokio::spawn(async move {
            receive_loop(socket, identity, loop_cancel).await;
        });

        Ok(ResponderHandle {
            cancel,
            task: Some(task),
        })
    }
}

/// Ownership of a running receive loop.
///
/// Stopping (or dropping) the handle cancels the loop; the socket lives on
/// the loop task and is released when it exits.
pub struct ResponderHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ResponderHandle {
    /// Signals the loop to stop and waits until the socket is released.
    ///
    /// Cancellation is cooperative and single-shot: the in-flight receive
    /// unblocks and the loop exits. Calling stop again is a no-op.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Responder task ended abnormally");
            }
        }
    }

    /// Returns true once the receive loop has been stopped and joined.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for ResponderHandle {
    fn drop(&mut self) {
        // An unjoined task still observes the cancellation at its next
        // suspension and exits, dropping the socket with it.
        self.cancel.cancel();
    }
}

/// Receive loop body: race cancellation against the next datagram.
async fn receive_loop(socket: UdpSocket, identity: InstanceId, cancel: CancellationToken) {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Responder shutdown requested");
                break;
            }

            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, peer)) => {
                        let payload = buf.get(..len).unwrap_or_default();
                        handle_datagram(&socket, &identity, payload, peer).await;
                    }
                    Err(e) => {
                        // One failed receive must not take the loop down.
                        warn!(error = %e, "Receive failed");
                    }
                }
            }
        }
    }
    // Socket drops here: released exactly once, whichever path broke the loop.
}

/// Decides whether one datagram deserves an alive response.
async fn handle_datagram(
    socket: &UdpSocket,
    identity: &InstanceId,
    payload: &[u8],
    peer: SocketAddr,
) {
    let probe_identity = match DiscoveryMessage::decode(payload) {
        Ok(DiscoveryMessage::Probe(id)) => id,
        // Responses and non-protocol traffic are expected on a shared port.
        Ok(DiscoveryMessage::Response(_)) | Err(_) => {
            debug!(%peer, "Ignoring non-probe datagram");
            return;
        }
    };

    if probe_identity != *identity {
        // Multiplexed by identity: unrelated applications share the port.
        debug!(%peer, "Ignoring probe for a different application");
        return;
    }

    let response = DiscoveryMessage::response(probe_identity);
    match socket.send_to(response.encode().as_bytes(), peer).await {
        Ok(_) => debug!(%peer, "Alive response sent"),
        Err(e) => warn!(%peer, error = %e, "Failed to send alive response"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solo_core::Scope;
    use std::time::Duration;

    fn test_config(port: u16) -> ProbeConfig {
        ProbeConfig::new(Scope::LocalOnly, port, Duration::from_millis(300))
            .expect("valid test config")
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let responder = Responder::new(InstanceId::new("stop-twice"), test_config(47_801));
        let mut handle = responder.start().expect("start responder");
        assert!(!handle.is_stopped());

        handle.stop().await;
        assert!(handle.is_stopped());

        // Second stop: no panic, no double release.
        handle.stop().await;
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_port_is_reusable_after_stop() {
        let config = test_config(47_811);
        let identity = InstanceId::new("rebind");

        let mut handle = Responder::new(identity.clone(), config.clone())
            .start()
            .expect("first start");
        handle.stop().await;

        // The released port can host a fresh responder.
        let mut next = Responder::new(identity, config).start().expect("second start");
        next.stop().await;
    }

    #[tokio::test]
    async fn test_drop_cancels_loop() {
        let config = test_config(47_821);
        let handle = Responder::new(InstanceId::new("dropped"), config)
            .start()
            .expect("start responder");
        let cancel = handle.cancel.clone();

        drop(handle);
        // Cancellation was issued on drop; the loop observes it and exits.
        assert!(cancel.is_cancelled());
    }
}
