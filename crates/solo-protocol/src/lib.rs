//! Solo Protocol - wire format for discovery datagrams
//!
//! This crate provides the message type exchanged between probers and
//! responders. One datagram carries one message; there is no framing
//! beyond the datagram boundary itself.

pub mod message;

pub use message::{DiscoveryMessage, WireError, MAX_DATAGRAM_LEN};
