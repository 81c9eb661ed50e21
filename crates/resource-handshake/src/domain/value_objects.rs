//! # Domain Value Objects
//!
//! Immutable value types shared by the handshake entity, the registry and
//! the protocol messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, already-authenticated peer identifier (the transport's key id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap a key id supplied by the transport layer.
    pub fn new(key_id: impl Into<String>) -> Self {
        Self(key_id.into())
    }

    /// True when the transport handed us no key id at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw key id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Single-use random token routed through the resource channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh random nonce (UUID v4 text).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing token, e.g. one read back from a downloaded file.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content address returned by the resource channel for uploaded bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a content address.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the address text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of comparing an echoed nonce against our own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalResult {
    /// No echo received yet.
    #[default]
    Unknown,
    /// The peer echoed our nonce exactly.
    Matched,
    /// The peer echoed something else.
    Mismatched,
}

impl LocalResult {
    /// Check if a verdict has been reached.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// The peer's verdict on the nonce we echoed back to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteResult {
    /// No verdict received yet.
    #[default]
    Unknown,
    /// The peer accepted our echo.
    Accepted,
    /// The peer rejected our echo.
    Rejected,
}

impl RemoteResult {
    /// Check if a verdict has been reached.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<bool> for RemoteResult {
    fn from(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }
}

/// Coarse per-peer protocol stage, derived from a handshake record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeStage {
    /// No record exists for the peer.
    NoHandshake,
    /// Record created, nonce not yet announced.
    Started,
    /// Nonce announced, waiting for the peer to echo it.
    AwaitingPeerNonce,
    /// Our nonce was verified, waiting for the peer's verdict on our echo.
    AwaitingLocalVerdict,
    /// Both verdicts are in and both are positive.
    Succeeded,
    /// Both verdicts are in and at least one is negative.
    Failed,
}

impl HandshakeStage {
    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_nonces_are_distinct() {
        let nonces: std::collections::HashSet<_> = (0..256).map(|_| Nonce::generate()).collect();
        assert_eq!(nonces.len(), 256);
    }

    #[test]
    fn test_empty_peer_id() {
        assert!(PeerId::new("").is_empty());
        assert!(!PeerId::from("node-b").is_empty());
    }

    #[test]
    fn test_remote_result_from_bool() {
        assert_eq!(RemoteResult::from(true), RemoteResult::Accepted);
        assert_eq!(RemoteResult::from(false), RemoteResult::Rejected);
        assert!(!RemoteResult::default().is_known());
    }

    #[test]
    fn test_stage_terminal() {
        assert!(HandshakeStage::Succeeded.is_terminal());
        assert!(HandshakeStage::Failed.is_terminal());
        assert!(!HandshakeStage::AwaitingPeerNonce.is_terminal());
    }
}
