//! # Inbound Ports
//!
//! API trait defining what a handshake-aware session can do.

use crate::domain::{HandshakeError, HandshakeMessage, HandshakeStage, TaskRequest};

/// What happened to an outgoing task request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request went out immediately.
    Sent,
    /// The request waits for the handshake to succeed.
    Deferred,
}

/// What the session should do after an incoming message.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageOutcome {
    /// Consumed by the handshake.
    Handled,
    /// A task request from a trusted peer, for the host.
    TaskRequest(TaskRequest),
    /// A task request from a peer we have not verified; ignored.
    Dropped,
    /// The session is closed.
    Closed,
}

/// Resource handshake API - inbound port.
pub trait ResourceHandshakeApi {
    /// Ask the peer for a task, handshaking first if needed.
    fn request_task(&mut self, request: TaskRequest) -> Result<RequestOutcome, HandshakeError>;

    /// React to a message received from the peer.
    fn handle_message(&mut self, message: HandshakeMessage) -> MessageOutcome;

    /// Current protocol stage with the peer.
    fn stage(&self) -> HandshakeStage;

    /// Whether the session has been torn down.
    fn is_closed(&self) -> bool;
}
