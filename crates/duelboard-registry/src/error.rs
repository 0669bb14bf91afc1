//! Error types for the registry.

use duelboard_transport::ConnectionId;

/// Errors that can occur while updating room assignments.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The connection already holds a room assignment. Assignments are
    /// never overwritten; the caller has to reject the join instead.
    #[error("{0} is already seated in room '{1}'")]
    AlreadySeated(ConnectionId, String),

    /// The connection was never registered, or has already been cleared.
    #[error("{0} is not registered")]
    NotRegistered(ConnectionId),
}
