//! Static Transfer Policy
//!
//! Implements `TaskMatching` with fixed transfer options and a log of
//! sessions reported unusable.

use crate::domain::{HandshakeError, HandshakeErrorKind, Nonce, PeerId};
use crate::ports::outbound::{TaskMatching, TransferOptions};
use parking_lot::Mutex;
use tracing::info;

/// Task-matching collaborator with fixed options.
#[derive(Default)]
pub struct StaticTransferPolicy {
    upload: TransferOptions,
    download: TransferOptions,
    unusable: Mutex<Vec<(PeerId, HandshakeErrorKind)>>,
}

impl StaticTransferPolicy {
    /// Policy with unrestricted transfers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `options` for every upload.
    pub fn with_upload_options(mut self, options: TransferOptions) -> Self {
        self.upload = options;
        self
    }

    /// Use `options` for every download.
    pub fn with_download_options(mut self, options: TransferOptions) -> Self {
        self.download = options;
        self
    }

    /// Peers reported unusable, with the error that caused it.
    pub fn unusable_sessions(&self) -> Vec<(PeerId, HandshakeErrorKind)> {
        self.unusable.lock().clone()
    }
}

impl TaskMatching for StaticTransferPolicy {
    fn upload_options(&self, _nonce: &Nonce, _peer: &PeerId) -> TransferOptions {
        self.upload.clone()
    }

    fn download_options(&self, _peer: &PeerId) -> TransferOptions {
        self.download.clone()
    }

    fn notify_session_unusable(&self, peer: &PeerId, error: &HandshakeError) {
        info!(peer = %peer, "[matching] Session unusable: {}", error);
        self.unusable.lock().push((peer.clone(), error.kind()));
    }
}
