//! Instance guard - the lifecycle controller.
//!
//! Sequences the startup decision: probe for a live instance, and when no
//! one answers, become the responder for instances that start later. The
//! guard owns the responder handle and the cancellation path for the rest
//! of the process lifetime.

use solo_core::{InstanceId, ProbeConfig};
use tracing::info;

use crate::prober::probe_for_existing_instance;
use crate::responder::{Responder, ResponderError, ResponderHandle};

/// Errors that can occur acquiring the guard.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// The winning instance could not start its responder
    #[error(transparent)]
    Responder(#[from] ResponderError),
}

/// Probe verdict plus, for the winning instance, ownership of the responder.
pub struct InstanceGuard {
    first_instance: bool,
    responder: Option<ResponderHandle>,
}

impl InstanceGuard {
    /// Probes for a live instance and, when none answers, starts responding
    /// to later probes.
    ///
    /// # Errors
    ///
    /// Fails only when this process wins the probe but cannot bind the
    /// discovery port. A duplicate never needs the port and never fails.
    pub async fn acquire(identity: InstanceId, config: ProbeConfig) -> Result<Self, GuardError> {
        if !probe_for_existing_instance(&identity, &config).await {
            return Ok(Self {
                first_instance: false,
                responder: None,
            });
        }

        info!(
            app = config.display_name(),
            identity = %identity,
            "No live instance found, continuing as first"
        );

        let responder = Responder::new(identity, config).start()?;
        Ok(Self {
            first_instance: true,
            responder: Some(responder),
        })
    }

    /// Returns true when this process is the canonical instance.
    #[must_use]
    pub fn is_first_instance(&self) -> bool {
        self.first_instance
    }

    /// Stops the responder and releases the discovery port.
    ///
    /// Idempotent; a duplicate has nothing to stop and returns immediately.
    pub async fn shutdown(&mut self) {
        if let Some(mut responder) = self.responder.take() {
            responder.stop().await;
        }
    }
}
