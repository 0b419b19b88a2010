//! Solo Core - identity and configuration for single-instance coordination
//!
//! This crate provides the leaf types shared between the prober, the
//! responder, and the demo binary: the application identity, the probe
//! configuration, and the same-host named-lock alternative.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod error;
pub mod identity;
pub mod lock;

// Re-exports for convenience
pub use config::{
    ProbeConfig, Scope, Settings, DEFAULT_DISCOVERY_PORT, DEFAULT_RESPONSE_TIMEOUT, PORT_ENV_VAR,
};
pub use error::{ConfigError, ConfigResult};
pub use identity::InstanceId;
pub use lock::NamedLock;
