//! Discovery message types and their text wire form.
//!
//! Wire representation is a delimited UTF-8 string, one message per datagram:
//!
//! ```text
//! "ApplicationAliveRequest:<identity>"
//! "ApplicationAliveResponse:<identity>"
//! ```
//!
//! Only the first `:` delimits; the identity may itself contain colons.
//! Anything that does not decode is foreign traffic on a shared port and is
//! discarded by receivers, never treated as an error.

use solo_core::InstanceId;
use std::fmt;
use thiserror::Error;

/// Kind tag for probe datagrams.
const REQUEST_TAG: &str = "ApplicationAliveRequest";

/// Kind tag for response datagrams.
const RESPONSE_TAG: &str = "ApplicationAliveResponse";

/// Receive buffer size for discovery datagrams.
///
/// Generous for any reasonable identity; a longer datagram arrives truncated,
/// fails the identity comparison, and is discarded like any foreign traffic.
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// A single discovery datagram payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryMessage {
    /// "Is an instance with this identity already listening?"
    Probe(InstanceId),
    /// "Yes - this identity is alive." Only ever sent in reply to a
    /// [`DiscoveryMessage::Probe`] carrying a byte-equal identity.
    Response(InstanceId),
}

impl DiscoveryMessage {
    /// Creates a probe for the given identity.
    pub fn probe(identity: impl Into<InstanceId>) -> Self {
        Self::Probe(identity.into())
    }

    /// Creates the response echoing the given identity.
    pub fn response(identity: impl Into<InstanceId>) -> Self {
        Self::Response(identity.into())
    }

    /// Returns the identity the message carries.
    pub fn identity(&self) -> &InstanceId {
        match self {
            Self::Probe(id) | Self::Response(id) => id,
        }
    }

    /// Serializes to the wire string.
    pub fn encode(&self) -> String {
        match self {
            Self::Probe(id) => format!("{REQUEST_TAG}:{id}"),
            Self::Response(id) => format!("{RESPONSE_TAG}:{id}"),
        }
    }

    /// Parses a datagram payload.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        let text = std::str::from_utf8(payload).map_err(|_| WireError::NotUtf8)?;
        let (kind, identity) = text.split_once(':').ok_or(WireError::MissingDelimiter)?;

        match kind {
            REQUEST_TAG => Ok(Self::Probe(InstanceId::new(identity))),
            RESPONSE_TAG => Ok(Self::Response(InstanceId::new(identity))),
            other => Err(WireError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DiscoveryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Reasons a datagram payload is not a discovery message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Payload is not valid UTF-8
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// No `:` between kind tag and identity
    #[error("payload has no kind/identity delimiter")]
    MissingDelimiter,

    /// Kind tag is neither the request nor the response tag
    #[error("unknown message kind: {kind}")]
    UnknownKind { kind: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_wire_form() {
        let msg = DiscoveryMessage::probe("1aee6cb7-ef42-4d78-97ba-ac8ae744c4a5");
        assert_eq!(
            msg.encode(),
            "ApplicationAliveRequest:1aee6cb7-ef42-4d78-97ba-ac8ae744c4a5"
        );
    }

    #[test]
    fn test_response_wire_form() {
        let msg = DiscoveryMessage::response("g-1");
        assert_eq!(msg.encode(), "ApplicationAliveResponse:g-1");
    }

    #[test]
    fn test_decode_probe() {
        let msg = DiscoveryMessage::decode(b"ApplicationAliveRequest:g-1").expect("decode");
        assert_eq!(msg, DiscoveryMessage::probe("g-1"));
        assert_eq!(msg.identity().as_str(), "g-1");
    }

    #[test]
    fn test_decode_response() {
        let msg = DiscoveryMessage::decode(b"ApplicationAliveResponse:g-1").expect("decode");
        assert_eq!(msg, DiscoveryMessage::response("g-1"));
    }

    #[test]
    fn test_identity_may_contain_colons() {
        let msg = DiscoveryMessage::probe("my-app:v2");
        let decoded = DiscoveryMessage::decode(msg.encode().as_bytes()).expect("decode");
        assert_eq!(decoded.identity().as_str(), "my-app:v2");
    }

    #[test]
    fn test_empty_identity_is_preserved() {
        let decoded = DiscoveryMessage::decode(b"ApplicationAliveRequest:").expect("decode");
        assert!(decoded.identity().is_empty());
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        assert_eq!(
            DiscoveryMessage::decode(b"ApplicationDeadRequest:g-1"),
            Err(WireError::UnknownKind {
                kind: "ApplicationDeadRequest".to_string()
            })
        );
    }

    #[test]
    fn test_decode_rejects_missing_delimiter() {
        assert_eq!(
            DiscoveryMessage::decode(b"ApplicationAliveRequest"),
            Err(WireError::MissingDelimiter)
        );
        assert_eq!(DiscoveryMessage::decode(b""), Err(WireError::MissingDelimiter));
    }

    #[test]
    fn test_decode_rejects_non_utf8() {
        assert_eq!(
            DiscoveryMessage::decode(&[0xff, 0xfe, b':', b'x']),
            Err(WireError::NotUtf8)
        );
    }

    #[test]
    fn test_kind_tags_are_case_sensitive() {
        assert!(DiscoveryMessage::decode(b"applicationaliverequest:g-1").is_err());
    }
}
