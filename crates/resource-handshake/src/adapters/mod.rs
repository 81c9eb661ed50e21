//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports, used by the demo
//! binary and the tests.

mod loopback;
mod resource_store;
mod transfer_policy;

pub use loopback::LoopbackChannel;
pub use resource_store::{content_hash, InMemoryResourceStore, SharedContent};
pub use transfer_policy::StaticTransferPolicy;
