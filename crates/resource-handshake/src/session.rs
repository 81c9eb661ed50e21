//! # Session Loop
//!
//! Serialises everything that touches one peer's handshake: host
//! requests, incoming messages and completions of spawned work all pass
//! through [`HandshakeSession::run`].

use crate::domain::{HandshakeMessage, HandshakeStage, PeerId, TaskRequest};
use crate::ports::{
    MessageOutcome, ResourceChannel, ResourceHandshakeApi, SessionChannel, TaskMatching,
};
use crate::service::{HandshakeController, SessionEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Input to a running session.
#[derive(Debug)]
pub enum SessionInput {
    /// The host wants a task from the peer.
    RequestTask(TaskRequest),
    /// A message arrived from the peer.
    Message(HandshakeMessage),
    /// The host closes the session.
    Close,
}

/// Final state of a session after `run` returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    /// Peer the session was with.
    pub peer: PeerId,
    /// Handshake stage at exit.
    pub stage: HandshakeStage,
    /// Whether the peer ended up blocked.
    pub blocked: bool,
}

/// A peer session driving one [`HandshakeController`].
pub struct HandshakeSession<R, S, T>
where
    R: ResourceChannel + 'static,
    S: SessionChannel,
    T: TaskMatching,
{
    controller: HandshakeController<R, S, T>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    /// Where task requests from trusted peers are delivered.
    deliveries: Option<mpsc::UnboundedSender<(PeerId, TaskRequest)>>,
}

impl<R, S, T> HandshakeSession<R, S, T>
where
    R: ResourceChannel + 'static,
    S: SessionChannel,
    T: TaskMatching,
{
    /// Wrap a controller and its completion receiver.
    pub fn new(
        controller: HandshakeController<R, S, T>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        Self {
            controller,
            events,
            deliveries: None,
        }
    }

    /// Deliver accepted task requests to `sink`.
    pub fn with_deliveries(mut self, sink: mpsc::UnboundedSender<(PeerId, TaskRequest)>) -> Self {
        self.deliveries = Some(sink);
        self
    }

    /// Process inputs until the session closes or the input queue ends.
    pub async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<SessionInput>) -> SessionReport {
        info!(peer = %self.controller.peer(), "[session] Running");

        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.controller.on_event(event),
                input = inputs.recv() => match input {
                    Some(SessionInput::RequestTask(request)) => self.request_task(request),
                    Some(SessionInput::Message(message)) => self.handle_message(message),
                    Some(SessionInput::Close) | None => {
                        self.controller.close();
                        break;
                    }
                },
            }

            if self.controller.is_closed() {
                break;
            }
        }

        let peer = self.controller.peer().clone();
        let report = SessionReport {
            stage: self.controller.stage(),
            blocked: self.controller.registry().is_blocked(&peer),
            peer,
        };
        info!(
            peer = %report.peer,
            stage = ?report.stage,
            settled = report.stage.is_terminal(),
            blocked = report.blocked,
            "[session] Closed"
        );
        report
    }

    fn request_task(&mut self, request: TaskRequest) {
        match self.controller.request_task(request) {
            Ok(outcome) => debug!(peer = %self.controller.peer(), ?outcome, "[session] Task requested"),
            Err(err) => debug!(peer = %self.controller.peer(), %err, "[session] Task request refused"),
        }
    }

    fn handle_message(&mut self, message: HandshakeMessage) {
        debug!(
            peer = %self.controller.peer(),
            message = message.name(),
            handshake = message.is_handshake(),
            "[session] Message received"
        );
        if let MessageOutcome::TaskRequest(request) = self.controller.handle_message(message) {
            let peer = self.controller.peer().clone();
            match &self.deliveries {
                Some(sink) => {
                    if sink.send((peer, request)).is_err() {
                        warn!("[session] Delivery sink closed, task request lost");
                    }
                }
                None => debug!(peer = %peer, task_id = %request.task_id, "[session] No delivery sink"),
            }
        }
    }
}
