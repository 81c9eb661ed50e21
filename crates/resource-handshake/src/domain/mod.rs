//! # Domain Module
//!
//! Core domain types for the resource handshake.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod messages;
pub mod registry;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use messages::*;
pub use registry::HandshakeRegistry;
pub use value_objects::*;
