//! # Handshake Registry
//!
//! Node-wide owner of the peer-id → handshake map and the deny-set.
//!
//! Shared between sessions as `Arc<HandshakeRegistry>`. Every operation is
//! a short synchronous critical section, so callers never hold the lock
//! across an await point.

use super::entities::ResourceHandshake;
use super::errors::HandshakeError;
use super::invariants::invariant_blocked_without_record;
use super::value_objects::{HandshakeStage, PeerId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct RegistryState {
    handshakes: HashMap<PeerId, ResourceHandshake>,
    denied: HashSet<PeerId>,
}

/// Handshake records and blocked peers for the whole node.
#[derive(Default)]
pub struct HandshakeRegistry {
    state: Mutex<RegistryState>,
}

impl HandshakeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the peer is in the deny-set.
    pub fn is_blocked(&self, peer: &PeerId) -> bool {
        self.state.lock().denied.contains(peer)
    }

    /// Check if a handshake record exists for the peer.
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.state.lock().handshakes.contains_key(peer)
    }

    /// Register a new handshake record.
    ///
    /// Fails with `PeerBlocked` for a denied peer. An existing record is
    /// replaced, keeping at most one record per peer.
    pub fn insert(&self, peer: PeerId, handshake: ResourceHandshake) -> Result<(), HandshakeError> {
        let mut state = self.state.lock();
        if state.denied.contains(&peer) {
            return Err(HandshakeError::PeerBlocked);
        }
        state.handshakes.insert(peer, handshake);
        Ok(())
    }

    /// Run `f` against the peer's record, if any.
    pub fn with_handshake<R>(
        &self,
        peer: &PeerId,
        f: impl FnOnce(&mut ResourceHandshake) -> R,
    ) -> Option<R> {
        self.state.lock().handshakes.get_mut(peer).map(f)
    }

    /// Clone of the peer's record.
    pub fn get(&self, peer: &PeerId) -> Option<ResourceHandshake> {
        self.state.lock().handshakes.get(peer).cloned()
    }

    /// Current protocol stage for the peer.
    pub fn stage(&self, peer: &PeerId) -> HandshakeStage {
        self.state
            .lock()
            .handshakes
            .get(peer)
            .map(ResourceHandshake::stage)
            .unwrap_or(HandshakeStage::NoHandshake)
    }

    /// Add the peer to the deny-set and drop its record.
    ///
    /// Returns the removed record so the caller can clean up its scratch file.
    pub fn block_peer(&self, peer: &PeerId) -> Option<ResourceHandshake> {
        let mut state = self.state.lock();
        state.denied.insert(peer.clone());
        let removed = state.handshakes.remove(peer);
        debug_assert!(invariant_blocked_without_record(&state.handshakes, &state.denied).is_empty());
        removed
    }

    /// Number of live handshake records.
    pub fn len(&self) -> usize {
        self.state.lock().handshakes.len()
    }

    /// True when no records exist.
    pub fn is_empty(&self) -> bool {
        self.state.lock().handshakes.is_empty()
    }

    /// Number of blocked peers.
    pub fn blocked_count(&self) -> usize {
        self.state.lock().denied.len()
    }

    /// Peers that are both blocked and still hold a record.
    pub fn invariant_violations(&self) -> Vec<PeerId> {
        let state = self.state.lock();
        invariant_blocked_without_record(&state.handshakes, &state.denied)
    }
}
