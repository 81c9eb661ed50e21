//! # Domain Invariants
//!
//! Business rules the handshake registry must never violate.

use super::value_objects::PeerId;
use std::collections::{HashMap, HashSet};

/// Invariant: a blocked peer never has a handshake record.
///
/// Returns the offending peers, empty when the invariant holds.
pub fn invariant_blocked_without_record<V>(
    handshakes: &HashMap<PeerId, V>,
    denied: &HashSet<PeerId>,
) -> Vec<PeerId> {
    denied
        .iter()
        .filter(|peer| handshakes.contains_key(*peer))
        .cloned()
        .collect()
}

/// Invariant: `finished` holds exactly when both verdicts are known.
pub fn invariant_finished_iff_both_known(
    finished: bool,
    local_known: bool,
    remote_known: bool,
) -> bool {
    finished == (local_known && remote_known)
}
