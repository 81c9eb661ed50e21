//! # Resource Handshake
//!
//! Mutual-trust bootstrap run between two compute-sharing nodes before
//! either accepts task requests from the other.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Prove that a peer controls the resource-distribution channel it claims,
//! not only the control channel:
//! - Each side writes a random nonce to a file and shares it through the
//!   resource channel, announcing only the content hash
//! - The other side downloads it and echoes the nonce back
//! - Each side answers the echo with a verdict
//!
//! A peer is trusted once its echo of our nonce matched and it accepted our
//! echo of its nonce. Any failure blocks the peer for the life of the
//! process and drops the session.
//!
//! ## Failure Handling
//!
//! | Failure | Result |
//! |---------|--------|
//! | Echoed nonce differs | Peer blocked, session dropped |
//! | Verdict without a handshake | Peer blocked, session dropped |
//! | No success within the timeout | Peer blocked, session dropped |
//! | Upload, download or file I/O fails | Peer blocked, session dropped |
//!
//! ## Module Structure
//!
//! ```text
//! resource-handshake/
//! ├── domain/          # ResourceHandshake, registry, messages, errors
//! ├── ports/           # ResourceHandshakeApi, ResourceChannel, SessionChannel, TaskMatching
//! ├── service.rs       # HandshakeController
//! ├── session.rs       # Per-session event loop
//! ├── adapters/        # In-process port implementations
//! ├── config.rs        # TOML configuration
//! └── telemetry.rs     # Tracing setup
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod session;
pub mod telemetry;

// Re-exports
pub use adapters::{content_hash, InMemoryResourceStore, LoopbackChannel, StaticTransferPolicy};
pub use config::{ConfigError, HandshakeConfig, DEFAULT_HANDSHAKE_TIMEOUT_SECS, DEFAULT_NONCE_LABEL};
pub use domain::{
    invariant_blocked_without_record, invariant_finished_iff_both_known, ContentHash,
    DisconnectReason, HandshakeError, HandshakeErrorKind, HandshakeMessage, HandshakeRegistry,
    HandshakeStage, LocalResult, Nonce, PeerId, RemoteResult, ResourceError, ResourceHandshake,
    TaskRequest,
};
pub use ports::{
    MessageOutcome, RequestOutcome, ResourceChannel, ResourceHandshakeApi, SessionChannel,
    TaskMatching, TransferOptions,
};
pub use service::{HandshakeController, SessionEvent};
pub use session::{HandshakeSession, SessionInput, SessionReport};
pub use telemetry::{init_tracing, TelemetryError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
