//! Connection registry for Duelboard.
//!
//! Tracks every live connection and the room it is currently seated in,
//! if any. The registry is the source of truth for "is this connection
//! already in a room?" and for resolving a disconnecting connection back
//! to the room it must be removed from.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Manager (above)  ← asks which room a connection belongs to
//!     ↕
//! Connection Registry (this crate)
//!     ↕
//! Transport (below)  ← provides ConnectionId
//! ```

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::ConnectionRegistry;
