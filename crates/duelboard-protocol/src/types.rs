//! Core protocol types for Duelboard's wire format.
//!
//! Inbound frames are decoded in two steps: first into an
//! [`InboundFrame`] (event name + raw JSON data), then into a typed
//! [`ClientEvent`]. Splitting it this way lets the server tell "this
//! wasn't a frame at all" apart from "this was a `join` with a broken
//! payload", and answer each one differently.
//!
//! Outbound events are a single [`ServerEvent`] enum, serialized in the
//! same `{"event": ..., "data": ...}` shape.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// One of the two seats in a room.
///
/// On the wire roles are the colours `"black"` (first to join, moves
/// first) and `"white"`. Board markers and the `player`/`winner` fields of
/// client events use integers instead: `2` for [`Role::First`] and `1` for
/// [`Role::Second`]. Both translations live here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// First occupant of a room. Holds the opening turn.
    #[serde(rename = "black")]
    First,
    /// Second occupant of a room.
    #[serde(rename = "white")]
    Second,
}

impl Role {
    /// The other role.
    pub fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// The value this role writes into a board cell.
    pub fn marker(self) -> u8 {
        match self {
            Self::First => 2,
            Self::Second => 1,
        }
    }

    /// Maps a client-supplied `player`/`winner` integer back to a role.
    pub fn from_marker(value: i64) -> Option<Self> {
        match value {
            2 => Some(Self::First),
            1 => Some(Self::Second),
            _ => None,
        }
    }

    /// The wire label (`"black"` / `"white"`).
    pub fn label(self) -> &'static str {
        match self {
            Self::First => "black",
            Self::Second => "white",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A square grid of cells, serialized row-major as `[[u8]]`.
///
/// `0` is an empty cell; anything else is the [`Role::marker`] of the
/// role that claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(Vec<Vec<u8>>);

impl Board {
    /// Value of an unclaimed cell.
    pub const EMPTY: u8 = 0;

    /// Creates an empty `size`×`size` board.
    pub fn new(size: usize) -> Self {
        Self(vec![vec![Self::EMPTY; size]; size])
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Returns the cell at `(row, column)`, or `None` when out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<u8> {
        self.0.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Claims an empty cell. Returns `false` (and changes nothing) if the
    /// cell is out of range or already taken.
    pub fn place(&mut self, row: usize, column: usize, marker: u8) -> bool {
        match self.0.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(cell) if *cell == Self::EMPTY => {
                *cell = marker;
                true
            }
            _ => false,
        }
    }

    /// Number of claimed cells.
    pub fn occupied(&self) -> usize {
        self.0
            .iter()
            .flatten()
            .filter(|c| **c != Self::EMPTY)
            .count()
    }

    /// Borrow the rows.
    pub fn rows(&self) -> &[Vec<u8>] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A decoded but not yet interpreted client frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundFrame {
    /// Event name, e.g. `"join"`.
    pub event: String,
    /// Raw event data. Missing data decodes as `null`.
    #[serde(default)]
    pub data: Value,
}

/// Payload of a `join` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRequest {
    /// Room identifier. Numbers are accepted and normalized to strings.
    #[serde(deserialize_with = "room_key")]
    pub room: String,
    /// Requested display name. Numbers and booleans are taken as their
    /// text form.
    #[serde(default, deserialize_with = "display_name")]
    pub name: Option<String>,
}

/// Payload of a `move` event.
///
/// Coordinates and the player value are kept signed and unchecked here;
/// the room decides whether they are acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoveRequest {
    #[serde(deserialize_with = "room_key")]
    pub room: String,
    pub row: i64,
    pub column: i64,
    /// `2` for the first role, `1` for the second.
    pub player: i64,
}

/// Payload of a `win` event.
#[derive(Debug, Clone, PartialEq)]
pub struct WinRequest {
    pub room: String,
    pub winner: i64,
    /// The complete `data` object as received, echoed in `game_over`.
    pub payload: Value,
}

#[derive(Deserialize)]
struct WinFields {
    #[serde(deserialize_with = "room_key")]
    room: String,
    winner: i64,
}

/// A typed client event.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Join(JoinRequest),
    Move(MoveRequest),
    Win(WinRequest),
}

impl ClientEvent {
    /// Interprets a frame's data according to its event name.
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownEvent`] for event names other than
    ///   `join`, `move` and `win`.
    /// - [`ProtocolError::InvalidPayload`] when the data doesn't fit.
    pub fn parse(frame: InboundFrame) -> Result<Self, ProtocolError> {
        let InboundFrame { event, data } = frame;
        let invalid = |source| ProtocolError::InvalidPayload {
            event: event.clone(),
            source,
        };

        match event.as_str() {
            "join" => serde_json::from_value(data)
                .map(Self::Join)
                .map_err(invalid),
            "move" => serde_json::from_value(data)
                .map(Self::Move)
                .map_err(invalid),
            "win" => {
                let fields: WinFields =
                    serde_json::from_value(data.clone()).map_err(invalid)?;
                Ok(Self::Win(WinRequest {
                    room: fields.room,
                    winner: fields.winner,
                    payload: data,
                }))
            }
            _ => Err(ProtocolError::UnknownEvent(event.clone())),
        }
    }

    /// The event name this was parsed from.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Move(_) => "move",
            Self::Win(_) => "win",
        }
    }
}

/// Room identifiers are strings, but clients are allowed to send plain
/// numbers (`"room": 7`).
fn room_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "room must be a string or number, got {other}"
        ))),
    }
}

fn display_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(de::Error::custom(format!(
            "name must be a string, number or boolean, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Sent to a connection that just took a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    /// The seat this connection now holds.
    pub color: Role,
    pub current_turn: Role,
    pub board: Board,
    /// Resolved display name (after placeholder substitution).
    pub player_name: String,
    pub room_id: String,
    /// Present only when the joiner filled the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_name: Option<String>,
}

/// Sent to the waiting seat when a second player arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentJoined {
    pub opponent_name: String,
    pub opponent_color: Role,
}

/// Display names keyed by wire role label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerNames {
    #[serde(rename = "black")]
    pub first: String,
    #[serde(rename = "white")]
    pub second: String,
}

/// Broadcast once a room has both seats filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    pub current_turn: Role,
    pub board: Board,
    pub player_names: PlayerNames,
    pub room_id: String,
}

/// Broadcast after an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveMade {
    pub row: usize,
    pub column: usize,
    /// Marker written to the board.
    pub player: u8,
    pub board: Board,
    /// Whose turn it is now.
    pub current_turn: Role,
}

/// Sent to the sender of a rejected move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidMove {
    pub reason: String,
}

/// Sent to the remaining seat when the other one disconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentLeft {
    /// Role that was vacated.
    pub color: Role,
    pub name: String,
}

/// Every event the server can emit.
///
/// Serialized adjacently tagged with snake_case names, so
/// `ServerEvent::RoomFull {}` becomes `{"event":"room_full","data":{}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomJoined(RoomJoined),
    OpponentJoined(OpponentJoined),
    StartGame(StartGame),
    MoveMade(MoveMade),
    InvalidMove(InvalidMove),
    /// The `win` payload, echoed untouched.
    GameOver(Value),
    OpponentLeft(OpponentLeft),
    /// The connection is already seated somewhere, or the server has no
    /// room for another game.
    JoinFailed { message: String },
    RoomFull {},
    /// The join could not be processed (bad payload or internal failure).
    JoinError { message: String },
    /// The room was closed for inactivity.
    #[serde(rename_all = "camelCase")]
    RoomExpired { room_id: String },
    /// A frame that couldn't be decoded or handled.
    Error { message: String },
}

impl ServerEvent {
    /// The event name as written on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomJoined(_) => "room_joined",
            Self::OpponentJoined(_) => "opponent_joined",
            Self::StartGame(_) => "start_game",
            Self::MoveMade(_) => "move_made",
            Self::InvalidMove(_) => "invalid_move",
            Self::GameOver(_) => "game_over",
            Self::OpponentLeft(_) => "opponent_left",
            Self::JoinFailed { .. } => "join_failed",
            Self::RoomFull {} => "room_full",
            Self::JoinError { .. } => "join_error",
            Self::RoomExpired { .. } => "room_expired",
            Self::Error { .. } => "error",
        }
    }
}
