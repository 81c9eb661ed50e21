//! # Outbound Ports
//!
//! Traits for the collaborators the handshake drives: the resource
//! channel, the peer session and the task-matching policy.

use crate::domain::{
    ContentHash, DisconnectReason, HandshakeError, HandshakeMessage, Nonce, PeerId, ResourceError,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Peer-specific transfer tuning supplied by the task-matching policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Preferred addresses to exchange content with.
    pub peers: Vec<String>,
    /// Upper bound for a single transfer.
    pub timeout: Option<Duration>,
}

impl TransferOptions {
    /// Options pinned to a single peer address.
    pub fn for_peer(address: impl Into<String>) -> Self {
        Self {
            peers: vec![address.into()],
            timeout: None,
        }
    }

    /// Set the transfer timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Content-addressed file distribution - outbound port.
#[async_trait]
pub trait ResourceChannel: Send + Sync {
    /// Resolve (and create) the scratch directory used for `label`.
    fn scratch_dir(&self, label: &str) -> Result<PathBuf, ResourceError>;

    /// Share a local file, returning its content address.
    async fn upload(
        &self,
        path: &Path,
        label: &str,
        absolute: bool,
        options: TransferOptions,
    ) -> Result<ContentHash, ResourceError>;

    /// Fetch the content named by `hash` into local files.
    async fn download(
        &self,
        hash: &ContentHash,
        label: &str,
        options: TransferOptions,
    ) -> Result<Vec<PathBuf>, ResourceError>;
}

/// Ordered message delivery to the connected peer - outbound port.
///
/// Both calls are fire-and-forget.
pub trait SessionChannel: Send + Sync {
    /// Enqueue a message for the peer.
    fn send(&self, message: HandshakeMessage);

    /// Tear the session down.
    fn disconnect(&self, reason: DisconnectReason);
}

/// Task-matching / node-policy collaborator - outbound port.
pub trait TaskMatching: Send + Sync {
    /// Upload tuning for sharing `nonce` with `peer`.
    fn upload_options(&self, nonce: &Nonce, peer: &PeerId) -> TransferOptions;

    /// Download tuning for content announced by `peer`.
    fn download_options(&self, peer: &PeerId) -> TransferOptions;

    /// The session with `peer` is no longer usable for scheduling.
    fn notify_session_unusable(&self, peer: &PeerId, error: &HandshakeError);
}
