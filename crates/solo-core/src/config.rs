//! Probe configuration: discovery scope, port, and response timeout.
//!
//! Created once at startup and never mutated. The demo binary resolves
//! values with CLI flags winning over the settings file, the settings file
//! over the `SOLO_PORT` environment variable, and that over the defaults.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

// ============================================================================
// Constants
// ============================================================================

/// Default well-known UDP discovery port.
pub const DEFAULT_DISCOVERY_PORT: u16 = 56_253;

/// Default bound on waiting for an alive response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Environment variable overriding the discovery port.
pub const PORT_ENV_VAR: &str = "SOLO_PORT";

/// Log label used when no application name is configured.
const FALLBACK_APP_NAME: &str = "Application";

// ============================================================================
// Scope
// ============================================================================

/// Where discovery probes are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only this host: probes target the loopback address.
    #[default]
    LocalOnly,
    /// The whole network segment: probes target the limited broadcast
    /// address. Requires broadcast permission on the send socket.
    NetworkWide,
}

impl Scope {
    /// The address probes are sent to. The port comes from [`ProbeConfig`].
    #[must_use]
    pub fn target_addr(&self) -> IpAddr {
        match self {
            Scope::LocalOnly => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Scope::NetworkWide => IpAddr::V4(Ipv4Addr::BROADCAST),
        }
    }

    /// Returns true when probes leave the host.
    #[must_use]
    pub fn is_network_wide(&self) -> bool {
        matches!(self, Scope::NetworkWide)
    }
}

// ============================================================================
// Probe Configuration
// ============================================================================

/// Immutable description of how to probe: scope, port, and timeout.
///
/// The responder receives on the configured port; the prober sends from
/// port + 1. Both must be open in the firewall for network-wide scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    scope: Scope,
    port: u16,
    response_timeout: Duration,
    app_name: Option<String>,
}

impl ProbeConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] unless 1 <= port <= 65534
    /// (port + 1 is the send port), and [`ConfigError::InvalidTimeout`]
    /// for a zero timeout.
    pub fn new(scope: Scope, port: u16, response_timeout: Duration) -> ConfigResult<Self> {
        if port == 0 || port == u16::MAX {
            return Err(ConfigError::InvalidPort { port });
        }
        if response_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Self {
            scope,
            port,
            response_timeout,
            app_name: None,
        })
    }

    /// Attaches a cosmetic application name, used only in log messages.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.app_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Returns the discovery scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the port the responder receives on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the port the prober sends from (receive port + 1).
    pub fn send_port(&self) -> u16 {
        self.port + 1
    }

    /// Returns the bound on waiting for an alive response.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Returns the application name for log messages.
    pub fn display_name(&self) -> &str {
        self.app_name.as_deref().unwrap_or(FALLBACK_APP_NAME)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            scope: Scope::LocalOnly,
            port: DEFAULT_DISCOVERY_PORT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            app_name: None,
        }
    }
}

// ============================================================================
// Settings File
// ============================================================================

/// On-disk settings (TOML). Every field is optional; missing values fall
/// back to CLI flags, the environment, or the defaults.
///
/// ```toml
/// identity = "1aee6cb7-ef42-4d78-97ba-ac8ae744c4a5"
/// app_name = "my-app"
/// scope = "local_only"
/// port = 56253
/// response_timeout_ms = 1000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub identity: Option<String>,
    pub app_name: Option<String>,
    pub scope: Option<Scope>,
    pub port: Option<u16>,
    pub response_timeout_ms: Option<u64>,
}

impl Settings {
    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::SettingsRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::SettingsParse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Reads the port override from [`PORT_ENV_VAR`], ignoring unparsable values.
pub fn port_from_env() -> Option<u16> {
    let raw = std::env::var(PORT_ENV_VAR).ok()?;
    match raw.trim().parse() {
        Ok(port) => Some(port),
        Err(_) => {
            tracing::warn!(value = %raw, "Ignoring unparsable {PORT_ENV_VAR}");
            None
        }
    }
}
