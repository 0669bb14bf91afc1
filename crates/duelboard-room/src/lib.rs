//! Room lifecycle management for Duelboard.
//!
//! A room is a two-seat game session keyed by a client-chosen string. The
//! [`RoomManager`] owns every room together with the connection registry
//! and applies one inbound event at a time: join, move, win, disconnect.
//! Each operation returns the [`Outbound`] events to deliver; the manager
//! itself never touches the network.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates/removes rooms, seats players, relays moves
//! - [`Room`] / [`Seat`]: one session and its occupants
//! - [`RoomConfig`]: board size, idle timeout, room limit
//! - [`RoomError`] / [`MoveError`]: join and move rejections

mod config;
mod error;
mod manager;
mod room;

pub use config::{DEFAULT_BOARD_SIZE, RoomConfig};
pub use error::{MoveError, RoomError};
pub use manager::{ANONYMOUS_NAME, Outbound, RoomManager};
pub use room::{Room, SEATS_PER_ROOM, Seat};
