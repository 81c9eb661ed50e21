//! # Domain Entities
//!
//! The per-peer handshake record.
//!
//! A record is created when we either originate a task request to a peer
//! we have never handshaken with, or receive a `ResourceHandshakeStart`
//! from such a peer. It carries two independent verdicts:
//!
//! - `local_result`: did the peer echo *our* nonce back correctly?
//! - `remote_result`: did the peer accept the nonce *we* echoed to it?
//!
//! Only when both are positive is the peer trusted.

use super::invariants::invariant_finished_iff_both_known;
use super::messages::TaskRequest;
use super::value_objects::{ContentHash, HandshakeStage, LocalResult, Nonce, RemoteResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One in-progress or completed resource handshake with a single peer.
#[derive(Clone, Debug)]
pub struct ResourceHandshake {
    /// Random token generated at construction.
    nonce: Nonce,
    /// Requests deferred until the handshake succeeds, oldest first.
    pending_requests: Vec<TaskRequest>,
    /// Where the nonce was written for upload; cleared once consumed.
    temp_file: Option<PathBuf>,
    /// Content address of the uploaded nonce.
    content_hash: Option<ContentHash>,
    /// Whether `start` has run.
    started: bool,
    /// Our verdict on the peer's echo of our nonce.
    local_result: LocalResult,
    /// The peer's verdict on our echo of its nonce.
    remote_result: RemoteResult,
}

impl ResourceHandshake {
    /// Create a record with a fresh nonce.
    ///
    /// `pending_request` is `None` when the handshake was started by an
    /// incoming message rather than an outgoing request.
    pub fn new(pending_request: Option<TaskRequest>) -> Self {
        Self {
            nonce: Nonce::generate(),
            pending_requests: pending_request.into_iter().collect(),
            temp_file: None,
            content_hash: None,
            started: false,
            local_result: LocalResult::Unknown,
            remote_result: RemoteResult::Unknown,
        }
    }

    /// Reset both verdicts and write the nonce to a fresh file under `dir`.
    pub fn start(&mut self, dir: &Path) -> io::Result<()> {
        self.local_result = LocalResult::Unknown;
        self.remote_result = RemoteResult::Unknown;
        self.content_hash = None;

        let path = dir.join(Uuid::new_v4().to_string());
        self.temp_file = Some(path.clone());
        self.started = true;

        fs::write(&path, self.nonce.as_str())
    }

    /// Read a nonce back from a downloaded file, ignoring surrounding whitespace.
    pub fn read_nonce(path: &Path) -> io::Result<Nonce> {
        let content = fs::read_to_string(path)?;
        Ok(Nonce::new(content.trim()))
    }

    /// Compare an echoed nonce with ours and record the outcome.
    pub fn verify_local(&mut self, candidate: &Nonce) -> bool {
        let matched = *candidate == self.nonce;
        self.local_result = if matched {
            LocalResult::Matched
        } else {
            LocalResult::Mismatched
        };
        matched
    }

    /// Record the peer's verdict on our echo.
    pub fn apply_remote_verdict(&mut self, accepted: bool) {
        self.remote_result = RemoteResult::from(accepted);
    }

    /// Both verdicts are in, whatever they are.
    pub fn finished(&self) -> bool {
        self.local_result.is_known() && self.remote_result.is_known()
    }

    /// Both verdicts are in and both are positive.
    pub fn success(&self) -> bool {
        self.local_result == LocalResult::Matched && self.remote_result == RemoteResult::Accepted
    }

    /// Derived protocol stage.
    pub fn stage(&self) -> HandshakeStage {
        debug_assert!(invariant_finished_iff_both_known(
            self.finished(),
            self.local_result.is_known(),
            self.remote_result.is_known(),
        ));
        if self.finished() {
            return if self.success() {
                HandshakeStage::Succeeded
            } else {
                HandshakeStage::Failed
            };
        }
        match (self.content_hash.is_some(), self.local_result) {
            (false, _) => HandshakeStage::Started,
            (true, LocalResult::Unknown) => HandshakeStage::AwaitingPeerNonce,
            (true, _) => HandshakeStage::AwaitingLocalVerdict,
        }
    }

    /// Our nonce.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Content address of our uploaded nonce, once known.
    pub fn content_hash(&self) -> Option<&ContentHash> {
        self.content_hash.as_ref()
    }

    /// Record where the nonce was uploaded to.
    pub fn set_content_hash(&mut self, hash: ContentHash) {
        self.content_hash = Some(hash);
    }

    /// Location of the nonce file, until it has been consumed.
    pub fn temp_file(&self) -> Option<&Path> {
        self.temp_file.as_deref()
    }

    /// Hand over the nonce file to whoever deletes it.
    pub fn take_temp_file(&mut self) -> Option<PathBuf> {
        self.temp_file.take()
    }

    /// Whether `start` has run.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Our verdict on the peer's echo.
    pub fn local_result(&self) -> LocalResult {
        self.local_result
    }

    /// The peer's verdict on our echo.
    pub fn remote_result(&self) -> RemoteResult {
        self.remote_result
    }

    /// Deferred requests, oldest first.
    pub fn pending_requests(&self) -> &[TaskRequest] {
        &self.pending_requests
    }

    /// Queue another request behind the ones already deferred.
    pub fn defer_request(&mut self, request: TaskRequest) {
        self.pending_requests.push(request);
    }

    /// Release every deferred request. Subsequent calls return an empty list.
    pub fn take_pending_requests(&mut self) -> Vec<TaskRequest> {
        std::mem::take(&mut self.pending_requests)
    }
}
