//! # Domain Errors
//!
//! Every handshake failure is terminal for the peer relationship: the peer
//! is blocked for the life of the process and the session is dropped.

use super::value_objects::{ContentHash, Nonce};
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the resource channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Nothing is stored under the requested content address.
    #[error("Resource not found: {0}")]
    NotFound(ContentHash),

    /// The channel refused the transfer.
    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Resource handshake error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// Peer is in the deny-set.
    #[error("Peer blocked")]
    PeerBlocked,

    /// The transport supplied no key id.
    #[error("empty key_id")]
    EmptyPeerIdentifier,

    /// Writing the nonce file failed.
    #[error("writing nonce to dir \"{}\": {reason}", .dir.display())]
    StartIo {
        /// Scratch directory that was targeted.
        dir: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The echoed nonce differs from the one we generated.
    #[error("nonce mismatch: {} != {got}", .expected.as_ref().map(Nonce::as_str).unwrap_or("None"))]
    NonceMismatch {
        /// Our nonce, if a handshake record exists.
        expected: Option<Nonce>,
        /// What the peer echoed.
        got: Nonce,
    },

    /// A verdict arrived with no matching handshake record.
    #[error("handshake not started")]
    UnsolicitedVerdict,

    /// The downloaded nonce could not be read.
    #[error("reading nonce from file {files:?}: {reason}")]
    NonceRead {
        /// Paths produced by the download.
        files: Vec<PathBuf>,
        /// Underlying failure.
        reason: String,
    },

    /// The handshake did not succeed in time.
    #[error("timeout")]
    Timeout,

    /// Uploading our nonce failed.
    #[error("upload failed: {0}")]
    Upload(ResourceError),

    /// Downloading the peer's nonce failed.
    #[error("download failed: {0}")]
    Download(ResourceError),
}

/// Fieldless discriminant of [`HandshakeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeErrorKind {
    /// See [`HandshakeError::PeerBlocked`].
    PeerBlocked,
    /// See [`HandshakeError::EmptyPeerIdentifier`].
    EmptyPeerIdentifier,
    /// See [`HandshakeError::StartIo`].
    HandshakeStartIoFailure,
    /// See [`HandshakeError::NonceMismatch`].
    NonceMismatch,
    /// See [`HandshakeError::UnsolicitedVerdict`].
    UnsolicitedVerdict,
    /// See [`HandshakeError::NonceRead`].
    NonceReadFailure,
    /// See [`HandshakeError::Timeout`].
    Timeout,
    /// See [`HandshakeError::Upload`].
    UploadFailure,
    /// See [`HandshakeError::Download`].
    DownloadFailure,
}

impl HandshakeError {
    /// Discriminant for assertions and log fields.
    pub fn kind(&self) -> HandshakeErrorKind {
        match self {
            Self::PeerBlocked => HandshakeErrorKind::PeerBlocked,
            Self::EmptyPeerIdentifier => HandshakeErrorKind::EmptyPeerIdentifier,
            Self::StartIo { .. } => HandshakeErrorKind::HandshakeStartIoFailure,
            Self::NonceMismatch { .. } => HandshakeErrorKind::NonceMismatch,
            Self::UnsolicitedVerdict => HandshakeErrorKind::UnsolicitedVerdict,
            Self::NonceRead { .. } => HandshakeErrorKind::NonceReadFailure,
            Self::Timeout => HandshakeErrorKind::Timeout,
            Self::Upload(_) => HandshakeErrorKind::UploadFailure,
            Self::Download(_) => HandshakeErrorKind::DownloadFailure,
        }
    }
}
