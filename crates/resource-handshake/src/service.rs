//! # Resource Handshake Controller
//!
//! Per-session protocol driver implementing [`ResourceHandshakeApi`].
//!
//! ## Protocol
//!
//! ```text
//!  A (requester)                                   B (responder)
//!  request_task ─┐
//!   start, upload nonce_a ──ResourceHandshakeStart(h_a)──▶ no record: start, upload nonce_b
//!                                                          download h_a
//!   verify_local(nonce_a) ◀──ResourceHandshakeNonce(nonce_a)──
//!   ──ResourceHandshakeVerdict(nonce_a, true)──▶          apply_remote_verdict
//!   download h_b ◀──ResourceHandshakeStart(h_b)──
//!   ──ResourceHandshakeNonce(nonce_b)──▶                  verify_local(nonce_b)
//!   apply_remote_verdict ◀──ResourceHandshakeVerdict(nonce_b, true)──
//!   success: send deferred WantToComputeTask ──▶
//! ```
//!
//! ## Concurrency
//!
//! The controller is driven from a single loop (see [`crate::session`]).
//! Uploads, downloads and the timeout run as spawned tasks that never touch
//! the registry; they post a [`SessionEvent`] back to the loop, which calls
//! [`HandshakeController::on_event`]. Each event carries the nonce of the
//! handshake that issued it, so completions for a record that was blocked
//! or replaced in the meantime are recognised and ignored.

use crate::config::HandshakeConfig;
use crate::domain::{
    ContentHash, DisconnectReason, HandshakeError, HandshakeMessage, HandshakeRegistry,
    HandshakeStage, Nonce, PeerId, ResourceError, ResourceHandshake, TaskRequest,
};
use crate::ports::{
    MessageOutcome, RequestOutcome, ResourceChannel, ResourceHandshakeApi, SessionChannel,
    TaskMatching,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[cfg(test)]
mod tests;

/// Completion of asynchronous work, delivered back to the session loop.
#[derive(Debug)]
pub enum SessionEvent {
    /// Upload of our nonce finished.
    NonceShared {
        /// Nonce of the handshake that started the upload.
        nonce: Nonce,
        /// The uploaded scratch file.
        file: PathBuf,
        /// Content address, or why the upload failed.
        result: Result<ContentHash, ResourceError>,
    },
    /// Download of the peer's nonce finished.
    NonceDownloaded {
        /// Nonce of our handshake at the time the download started.
        nonce: Nonce,
        /// The peer's nonce, or why it could not be obtained.
        result: Result<Nonce, HandshakeError>,
    },
    /// The handshake timeout elapsed.
    TimerFired {
        /// Nonce of the handshake the timer was armed for.
        nonce: Nonce,
    },
}

/// Resource handshake controller for one peer session.
///
/// ## Dependencies
///
/// - `R: ResourceChannel` - nonce upload/download
/// - `S: SessionChannel` - messages to the peer, disconnect
/// - `T: TaskMatching` - transfer options, unusable-session notifications
pub struct HandshakeController<R, S, T>
where
    R: ResourceChannel + 'static,
    S: SessionChannel,
    T: TaskMatching,
{
    /// Peer on the other end of this session.
    peer: PeerId,
    /// Protocol configuration.
    config: HandshakeConfig,
    /// Node-wide handshake records and deny-set.
    registry: Arc<HandshakeRegistry>,
    /// Resource channel adapter.
    resources: Arc<R>,
    /// Message channel adapter.
    session: Arc<S>,
    /// Task-matching collaborator.
    tasks: Arc<T>,
    /// Completion sink feeding the session loop.
    events: mpsc::UnboundedSender<SessionEvent>,
    /// Armed timeout, if any.
    timer: Option<JoinHandle<()>>,
    /// Set once the session has been torn down.
    closed: bool,
}

impl<R, S, T> HandshakeController<R, S, T>
where
    R: ResourceChannel + 'static,
    S: SessionChannel,
    T: TaskMatching,
{
    /// Create a controller and the receiver its completions arrive on.
    pub fn new(
        peer: PeerId,
        config: HandshakeConfig,
        registry: Arc<HandshakeRegistry>,
        resources: Arc<R>,
        session: Arc<S>,
        tasks: Arc<T>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            peer,
            config,
            registry,
            resources,
            session,
            tasks,
            events,
            timer: None,
            closed: false,
        };
        (controller, receiver)
    }

    /// Peer on the other end of this session.
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<HandshakeRegistry> {
        &self.registry
    }

    /// Whether a timeout is currently armed.
    pub fn timer_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Whether a record exists for the peer and is not yet finished.
    pub fn handshake_in_progress(&mut self) -> Result<bool, HandshakeError> {
        if self.peer.is_empty() {
            return Err(self.fail(HandshakeError::EmptyPeerIdentifier));
        }
        Ok(self
            .registry
            .with_handshake(&self.peer, |handshake| !handshake.finished())
            .unwrap_or(false))
    }

    /// Apply a completion posted by a spawned task.
    pub fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::NonceShared {
                nonce,
                file,
                result,
            } => self.on_nonce_shared(nonce, file, result),
            SessionEvent::NonceDownloaded { nonce, result } => {
                self.on_nonce_downloaded(nonce, result)
            }
            SessionEvent::TimerFired { nonce } => self.on_timer_fired(nonce),
        }
    }

    /// Close the session locally.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.cancel_timer();
        self.closed = true;
        self.session.disconnect(DisconnectReason::Shutdown);
    }

    // =========================================================================
    // START HANDSHAKE
    // =========================================================================

    fn start_handshake(&mut self, pending: Option<TaskRequest>) -> Result<(), HandshakeError> {
        info!(peer = %self.peer, "[handshake] Starting resource handshake");

        let mut handshake = ResourceHandshake::new(pending);
        let dir = match self.resources.scratch_dir(&self.config.nonce_label) {
            Ok(dir) => dir,
            Err(err) => {
                return Err(self.fail(HandshakeError::StartIo {
                    dir: PathBuf::from(&self.config.nonce_label),
                    reason: err.to_string(),
                }))
            }
        };

        if let Err(err) = handshake.start(&dir) {
            if let Some(file) = handshake.take_temp_file() {
                remove_scratch(&file);
            }
            return Err(self.fail(HandshakeError::StartIo {
                dir,
                reason: err.to_string(),
            }));
        }

        let nonce = handshake.nonce().clone();
        let file = handshake.temp_file().map(Path::to_path_buf);

        if let Err(err) = self.registry.insert(self.peer.clone(), handshake) {
            if let Some(file) = &file {
                remove_scratch(file);
            }
            return Err(self.fail(err));
        }

        self.arm_timer(nonce.clone());
        if let Some(file) = file {
            self.share_nonce(nonce, file);
        }
        Ok(())
    }

    fn arm_timer(&mut self, nonce: Nonce) {
        self.cancel_timer();

        let events = self.events.clone();
        let timeout = self.config.timeout();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            events.send(SessionEvent::TimerFired { nonce }).ok();
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    // =========================================================================
    // SHARE NONCE
    // =========================================================================

    fn share_nonce(&self, nonce: Nonce, file: PathBuf) {
        let options = self.tasks.upload_options(&nonce, &self.peer);
        let resources = Arc::clone(&self.resources);
        let events = self.events.clone();
        let label = self.config.nonce_label.clone();

        tokio::spawn(async move {
            let result = resources.upload(&file, &label, true, options).await;
            if let Err(unsent) = events.send(SessionEvent::NonceShared {
                nonce,
                file,
                result,
            }) {
                debug!("[handshake] Session gone before upload completed");
                if let SessionEvent::NonceShared { file, .. } = unsent.0 {
                    if let Err(err) = tokio::fs::remove_file(&file).await {
                        debug!(file = %file.display(), %err, "[handshake] Could not remove nonce file");
                    }
                }
            }
        });
    }

    fn on_nonce_shared(
        &mut self,
        nonce: Nonce,
        file: PathBuf,
        result: Result<ContentHash, ResourceError>,
    ) {
        let hash = match result {
            Ok(hash) => hash,
            Err(err) => {
                if self.is_current(&nonce) {
                    self.fail(HandshakeError::Upload(err));
                } else {
                    debug!(peer = %self.peer, "[handshake] Ignoring upload failure of a stale handshake");
                }
                remove_scratch(&file);
                return;
            }
        };

        let current = self
            .registry
            .with_handshake(&self.peer, |handshake| {
                if handshake.nonce() != &nonce {
                    return false;
                }
                handshake.set_content_hash(hash.clone());
                // Same path as `file`, removed below
                handshake.take_temp_file();
                true
            })
            .unwrap_or(false);

        remove_scratch(&file);
        if !current {
            debug!(peer = %self.peer, hash = %hash, "[handshake] Ignoring upload of a stale handshake");
            return;
        }

        if self.closed {
            return;
        }

        debug!(peer = %self.peer, hash = %hash, "[handshake] Sending resource hash");
        self.session.send(HandshakeMessage::ResourceHandshakeStart { content_hash: hash });
    }

    // =========================================================================
    // DOWNLOAD NONCE
    // =========================================================================

    fn download_nonce(&self, hash: ContentHash) {
        let Some(local) = self
            .registry
            .with_handshake(&self.peer, |handshake| handshake.nonce().clone())
        else {
            return;
        };

        let options = self.tasks.download_options(&self.peer);
        let resources = Arc::clone(&self.resources);
        let events = self.events.clone();
        let label = self.config.nonce_label.clone();

        tokio::spawn(async move {
            let result = match resources.download(&hash, &label, options).await {
                Ok(files) => read_downloaded_nonce(files).await,
                Err(err) => Err(HandshakeError::Download(err)),
            };
            events
                .send(SessionEvent::NonceDownloaded {
                    nonce: local,
                    result,
                })
                .ok();
        });
    }

    fn on_nonce_downloaded(&mut self, nonce: Nonce, result: Result<Nonce, HandshakeError>) {
        if self.closed || !self.is_current(&nonce) {
            debug!(peer = %self.peer, "[handshake] Ignoring download for a stale handshake");
            return;
        }

        match result {
            Ok(peer_nonce) => {
                self.session
                    .send(HandshakeMessage::ResourceHandshakeNonce { nonce: peer_nonce });
            }
            Err(err) => {
                self.fail(err);
            }
        }
    }

    // =========================================================================
    // MESSAGE REACTIONS
    // =========================================================================

    fn on_handshake_start(&mut self, hash: ContentHash) {
        if self.peer.is_empty() {
            self.fail(HandshakeError::EmptyPeerIdentifier);
            return;
        }
        if self.registry.is_blocked(&self.peer) {
            self.fail(HandshakeError::PeerBlocked);
            return;
        }

        let existing = self.registry.with_handshake(&self.peer, |handshake| {
            (handshake.success(), handshake.content_hash().cloned())
        });

        match existing {
            None => {
                if self.start_handshake(None).is_err() {
                    return;
                }
            }
            Some((true, Some(own_hash))) => {
                // Peer lost its state (most likely restarted)
                debug!(peer = %self.peer, "[handshake] Re-sending own resource hash to resynchronise");
                self.session.send(HandshakeMessage::ResourceHandshakeStart {
                    content_hash: own_hash,
                });
            }
            Some(_) => {}
        }

        self.download_nonce(hash);
    }

    fn on_handshake_nonce(&mut self, candidate: Nonce) {
        let verified = self.registry.with_handshake(&self.peer, |handshake| {
            (handshake.verify_local(&candidate), handshake.nonce().clone())
        });
        let accepted = verified.as_ref().is_some_and(|(matched, _)| *matched);

        self.session.send(HandshakeMessage::ResourceHandshakeVerdict {
            nonce: candidate.clone(),
            accepted,
        });

        if accepted {
            self.finalize();
        } else {
            self.fail(HandshakeError::NonceMismatch {
                expected: verified.map(|(_, nonce)| nonce),
                got: candidate,
            });
        }
    }

    fn on_handshake_verdict(&mut self, accepted: bool) {
        let applied = self
            .registry
            .with_handshake(&self.peer, |handshake| {
                handshake.apply_remote_verdict(accepted)
            })
            .is_some();

        if applied {
            self.finalize();
        } else {
            self.fail(HandshakeError::UnsolicitedVerdict);
        }
    }

    fn on_task_request(&self, request: TaskRequest) -> MessageOutcome {
        let trusted = self
            .registry
            .with_handshake(&self.peer, |handshake| handshake.success())
            .unwrap_or(false);

        if trusted || !self.config.gate_inbound_requests {
            return MessageOutcome::TaskRequest(request);
        }

        warn!(
            peer = %self.peer,
            task_id = %request.task_id,
            "[handshake] Dropping task request from unverified peer"
        );
        MessageOutcome::Dropped
    }

    // =========================================================================
    // FINALIZE HANDSHAKE
    // =========================================================================

    fn finalize(&mut self) {
        let Some((finished, success, pending)) =
            self.registry.with_handshake(&self.peer, |handshake| {
                let pending = if handshake.success() {
                    handshake.take_pending_requests()
                } else {
                    Vec::new()
                };
                (handshake.finished(), handshake.success(), pending)
            })
        else {
            return;
        };

        if finished {
            info!(peer = %self.peer, success, "[handshake] Finished resource handshake");
        }
        if success {
            self.cancel_timer();
        }
        for request in pending {
            info!(
                peer = %self.peer,
                task_id = %request.task_id,
                "[handshake] Sending deferred task request"
            );
            self.session.send(HandshakeMessage::WantToComputeTask(request));
        }
    }

    fn on_timer_fired(&mut self, nonce: Nonce) {
        self.timer = None;
        let expired = self
            .registry
            .with_handshake(&self.peer, |handshake| {
                handshake.nonce() == &nonce && !handshake.success()
            })
            .unwrap_or(false);

        if expired {
            self.fail(HandshakeError::Timeout);
        }
    }

    // =========================================================================
    // ERROR HANDLING
    // =========================================================================

    /// Terminal path shared by every handshake failure.
    ///
    /// Blocks the peer, drops its record, tells the task-matching side and
    /// disconnects. Returns the error for the caller to propagate.
    fn fail(&mut self, error: HandshakeError) -> HandshakeError {
        error!(
            peer = %self.peer,
            kind = ?error.kind(),
            "[handshake] Resource handshake error: {}",
            error
        );

        self.cancel_timer();
        if let Some(mut removed) = self.registry.block_peer(&self.peer) {
            if let Some(file) = removed.take_temp_file() {
                remove_scratch(&file);
            }
        }
        self.tasks.notify_session_unusable(&self.peer, &error);

        if !self.closed {
            self.closed = true;
            self.session
                .disconnect(DisconnectReason::ResourceHandshakeTimeout);
        }
        error
    }

    fn is_current(&self, nonce: &Nonce) -> bool {
        self.registry
            .with_handshake(&self.peer, |handshake| handshake.nonce() == nonce)
            .unwrap_or(false)
    }
}

impl<R, S, T> ResourceHandshakeApi for HandshakeController<R, S, T>
where
    R: ResourceChannel + 'static,
    S: SessionChannel,
    T: TaskMatching,
{
    fn request_task(&mut self, request: TaskRequest) -> Result<RequestOutcome, HandshakeError> {
        if self.peer.is_empty() {
            return Err(self.fail(HandshakeError::EmptyPeerIdentifier));
        }
        if self.registry.is_blocked(&self.peer) {
            return Err(self.fail(HandshakeError::PeerBlocked));
        }

        let existing = self
            .registry
            .with_handshake(&self.peer, |handshake| handshake.success());

        match existing {
            None => {
                self.start_handshake(Some(request))?;
                Ok(RequestOutcome::Deferred)
            }
            Some(success) if success || !self.config.require_success_for_fast_path => {
                self.session.send(HandshakeMessage::WantToComputeTask(request));
                Ok(RequestOutcome::Sent)
            }
            Some(_) => {
                let task_id = request.task_id.clone();
                let queued = self.registry.with_handshake(&self.peer, |handshake| {
                    handshake.defer_request(request);
                    handshake.pending_requests().len()
                });
                debug!(
                    peer = %self.peer,
                    %task_id,
                    queued = queued.unwrap_or(0),
                    "[handshake] Deferring task request until handshake succeeds"
                );
                Ok(RequestOutcome::Deferred)
            }
        }
    }

    fn handle_message(&mut self, message: HandshakeMessage) -> MessageOutcome {
        if self.closed {
            debug!(peer = %self.peer, message = message.name(), "[handshake] Session closed, ignoring message");
            return MessageOutcome::Closed;
        }

        match message {
            HandshakeMessage::ResourceHandshakeStart { content_hash } => {
                self.on_handshake_start(content_hash)
            }
            HandshakeMessage::ResourceHandshakeNonce { nonce } => self.on_handshake_nonce(nonce),
            HandshakeMessage::ResourceHandshakeVerdict { accepted, .. } => {
                self.on_handshake_verdict(accepted)
            }
            HandshakeMessage::WantToComputeTask(request) => return self.on_task_request(request),
            HandshakeMessage::Disconnect { reason } => {
                info!(peer = %self.peer, %reason, "[handshake] Peer disconnected");
                self.cancel_timer();
                self.closed = true;
            }
        }

        if self.closed {
            MessageOutcome::Closed
        } else {
            MessageOutcome::Handled
        }
    }

    fn stage(&self) -> HandshakeStage {
        self.registry.stage(&self.peer)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<R, S, T> Drop for HandshakeController<R, S, T>
where
    R: ResourceChannel + 'static,
    S: SessionChannel,
    T: TaskMatching,
{
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Read the nonce from the first downloaded file, then delete every downloaded file.
async fn read_downloaded_nonce(files: Vec<PathBuf>) -> Result<Nonce, HandshakeError> {
    let Some(path) = files.first().cloned() else {
        return Err(HandshakeError::NonceRead {
            files,
            reason: "download produced no files".to_string(),
        });
    };

    let read = tokio::task::spawn_blocking(move || ResourceHandshake::read_nonce(&path)).await;

    for file in &files {
        if let Err(err) = tokio::fs::remove_file(file).await {
            debug!(file = %file.display(), %err, "[handshake] Could not remove downloaded nonce");
        }
    }

    match read {
        Ok(Ok(nonce)) => Ok(nonce),
        Ok(Err(err)) => Err(HandshakeError::NonceRead {
            files,
            reason: err.to_string(),
        }),
        Err(err) => Err(HandshakeError::NonceRead {
            files,
            reason: err.to_string(),
        }),
    }
}

fn remove_scratch(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(file = %path.display(), %err, "[handshake] Could not remove nonce file");
        }
    }
}
