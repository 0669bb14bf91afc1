//! Error types for the room layer.
//!
//! These are client-facing rejections, not failures: each one is turned
//! into an event for the offending sender and nothing else changes.

use duelboard_protocol::{Role, ServerEvent};
use duelboard_registry::RegistryError;
use duelboard_transport::ConnectionId;

/// Why a join was refused.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The connection is already seated (in this room or another).
    #[error("{0} is already in room '{1}'")]
    AlreadyInRoom(ConnectionId, String),

    /// Both seats of the room are taken.
    #[error("room '{0}' is full")]
    RoomFull(String),

    /// Creating the room would exceed the configured room limit.
    #[error("server is at its limit of {0} rooms")]
    AtCapacity(usize),

    /// The registry refused the assignment.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RoomError {
    /// The event sent back to the connection whose join was refused.
    pub fn to_event(&self) -> ServerEvent {
        match self {
            Self::AlreadyInRoom(..) => ServerEvent::JoinFailed {
                message: "You are already in a room".to_owned(),
            },
            Self::RoomFull(_) => ServerEvent::RoomFull {},
            Self::AtCapacity(_) => ServerEvent::JoinFailed {
                message: self.to_string(),
            },
            Self::Registry(e) => ServerEvent::JoinError {
                message: e.to_string(),
            },
        }
    }
}

/// Why a move was refused. Rendered as the `invalid_move` reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The `player` value is neither 1 nor 2.
    #[error("unknown player value {0}")]
    UnknownRole(i64),

    #[error("it is {current}'s turn, not {attempted}'s")]
    NotYourTurn { attempted: Role, current: Role },

    /// The sender holds no seat in the room.
    #[error("you are not seated in this room")]
    NotSeated,

    /// The sender is seated, but as the other role.
    #[error("you are not playing {0}")]
    NotYourSeat(Role),

    #[error("cell ({row}, {column}) is outside the {size}x{size} board")]
    OutOfBounds { row: i64, column: i64, size: usize },

    #[error("cell ({row}, {column}) is already occupied")]
    CellOccupied { row: usize, column: usize },
}
