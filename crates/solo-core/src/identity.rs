//! Instance identity value object.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Identifier scoping the discovery protocol to one logical application.
///
/// Two processes belong to the same application iff their identifiers are
/// byte-equal, which is what lets unrelated applications share a discovery
/// port without interfering. Immutable for the process lifetime.
///
/// Callers should ship one fixed GUID per application. [`InstanceId::generate`]
/// exists for ad-hoc tooling, where a fresh identity means the probe can only
/// ever match another process started with the same generated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Creates an InstanceId from a caller-supplied string.
    ///
    /// The value is opaque: no format validation is performed, comparison
    /// is byte-equality.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh UUIDv4 identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identity is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for InstanceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
