//! Wire protocol for Duelboard.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Role`], [`Board`], [`ClientEvent`], [`ServerEvent`]):
//!   the values that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding a
//!   frame or one of its payloads.
//!
//! Every frame is a JSON object naming an event and carrying its data:
//!
//! ```text
//! {"event": "move", "data": {"room": "R1", "row": 0, "column": 0, "player": 2}}
//! ```
//!
//! The protocol layer knows nothing about connections or rooms. It only
//! knows how to turn frames into typed events and back.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Board, ClientEvent, InboundFrame, InvalidMove, JoinRequest, MoveMade,
    MoveRequest, OpponentJoined, OpponentLeft, PlayerNames, Role,
    RoomJoined, ServerEvent, StartGame, WinRequest,
};
