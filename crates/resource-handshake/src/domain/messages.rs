//! # Protocol Messages
//!
//! Semantic payloads exchanged over the message channel. Wire encoding
//! belongs to the transport; these types only derive serde so any codec
//! can carry them.

use super::value_objects::{ContentHash, Nonce};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload of a `WantToComputeTask` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Name of the requesting node.
    pub node_name: String,
    /// Task the node wants to compute.
    pub task_id: String,
    /// Benchmark result for this task type.
    pub perf_index: f64,
    /// Offered price per hour.
    pub price: u64,
    /// Disk space the node can offer, in bytes.
    pub max_resource_size: u64,
    /// Memory the node can offer, in bytes.
    pub max_memory_size: u64,
    /// CPU cores the node can offer.
    pub num_cores: u32,
}

/// Reason attached to a `Disconnect` message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// Used for every resource handshake failure, not only timeouts.
    ResourceHandshakeTimeout,
    /// Session closed by the local host.
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceHandshakeTimeout => write!(f, "ResourceHandshakeTimeout"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Messages the handshake sends and reacts to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HandshakeMessage {
    /// The deferred or forwarded task request.
    WantToComputeTask(TaskRequest),
    /// Announces where the sender's nonce can be fetched.
    ResourceHandshakeStart {
        /// Content address of the uploaded nonce file.
        content_hash: ContentHash,
    },
    /// Echoes back a downloaded nonce for verification.
    ResourceHandshakeNonce {
        /// The nonce read from the downloaded file.
        nonce: Nonce,
    },
    /// Local verification outcome for an echoed nonce.
    ResourceHandshakeVerdict {
        /// The nonce that was echoed.
        nonce: Nonce,
        /// Whether it matched.
        accepted: bool,
    },
    /// Session teardown.
    Disconnect {
        /// Why the session is closing.
        reason: DisconnectReason,
    },
}

impl HandshakeMessage {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WantToComputeTask(_) => "WantToComputeTask",
            Self::ResourceHandshakeStart { .. } => "ResourceHandshakeStart",
            Self::ResourceHandshakeNonce { .. } => "ResourceHandshakeNonce",
            Self::ResourceHandshakeVerdict { .. } => "ResourceHandshakeVerdict",
            Self::Disconnect { .. } => "Disconnect",
        }
    }

    /// True for the three messages that drive the handshake itself.
    pub fn is_handshake(&self) -> bool {
        matches!(
            self,
            Self::ResourceHandshakeStart { .. }
                | Self::ResourceHandshakeNonce { .. }
                | Self::ResourceHandshakeVerdict { .. }
        )
    }
}
