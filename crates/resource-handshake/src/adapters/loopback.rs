//! Loopback Session Channel
//!
//! Implements `SessionChannel` by forwarding messages into another
//! session's input queue in the same process. Everything sent is also
//! recorded for inspection.

use crate::domain::{DisconnectReason, HandshakeMessage};
use crate::ports::outbound::SessionChannel;
use crate::session::SessionInput;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// In-process message channel to a peer session.
#[derive(Default)]
pub struct LoopbackChannel {
    /// Peer session's input queue; `None` only records.
    peer: Option<mpsc::UnboundedSender<SessionInput>>,
    sent: Mutex<Vec<HandshakeMessage>>,
    disconnects: Mutex<Vec<DisconnectReason>>,
}

impl LoopbackChannel {
    /// Channel that forwards to `peer`.
    pub fn connected(peer: mpsc::UnboundedSender<SessionInput>) -> Self {
        Self {
            peer: Some(peer),
            ..Self::default()
        }
    }

    /// Channel that only records.
    pub fn recording() -> Self {
        Self::default()
    }

    /// Every message sent so far, in order.
    pub fn sent(&self) -> Vec<HandshakeMessage> {
        self.sent.lock().clone()
    }

    /// Drain the recorded messages.
    pub fn take_sent(&self) -> Vec<HandshakeMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Every disconnect requested so far.
    pub fn disconnects(&self) -> Vec<DisconnectReason> {
        self.disconnects.lock().clone()
    }

    fn forward(&self, message: HandshakeMessage) {
        let Some(peer) = &self.peer else {
            return;
        };
        if peer.send(SessionInput::Message(message)).is_err() {
            debug!("[loopback] Peer session gone, message dropped");
        }
    }
}

impl SessionChannel for LoopbackChannel {
    fn send(&self, message: HandshakeMessage) {
        trace!(message = message.name(), "[loopback] send");
        self.sent.lock().push(message.clone());
        self.forward(message);
    }

    fn disconnect(&self, reason: DisconnectReason) {
        debug!(%reason, "[loopback] disconnect");
        self.disconnects.lock().push(reason);
        self.forward(HandshakeMessage::Disconnect { reason });
    }
}
