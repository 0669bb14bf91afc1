//! Room manager: seats connections, relays moves, and cleans up rooms.

use std::collections::HashMap;
use std::time::Instant;

use duelboard_protocol::{
    InvalidMove, MoveRequest, OpponentJoined, OpponentLeft, Role, RoomJoined,
    ServerEvent, StartGame, WinRequest,
};
use duelboard_registry::ConnectionRegistry;
use duelboard_transport::ConnectionId;

use crate::{Room, RoomConfig, RoomError};

/// Display name clients send when the user didn't pick one.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// One event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl Outbound {
    fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}

/// Manages all active rooms and tracks which connection is in which room.
///
/// Every public operation handles exactly one inbound event and returns
/// the events to deliver, in delivery order. Rejections are returned as
/// events too; nothing here fails with an error the caller has to handle.
///
/// Not thread-safe by itself. The server keeps it behind one lock, which
/// is what serializes joins, moves, and disconnects for every room.
pub struct RoomManager {
    /// Active rooms, keyed by the client-supplied identifier.
    rooms: HashMap<String, Room>,

    /// Every live connection and its current room.
    registry: ConnectionRegistry,

    config: RoomConfig,
}

impl RoomManager {
    /// Creates a manager with no rooms and no connections.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            registry: ConnectionRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Registers a freshly accepted connection.
    pub fn connect(&mut self, connection: ConnectionId) {
        self.registry.register(connection);
    }

    // -----------------------------------------------------------------
    // join
    // -----------------------------------------------------------------

    /// Seats `connection` in `room_id`, creating the room if needed.
    ///
    /// On success the joiner gets `room_joined`. If that filled the room,
    /// the waiting player also gets `opponent_joined` and both get
    /// `start_game`. Refusals go to the joiner only and change nothing.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        room_id: &str,
        name: Option<&str>,
    ) -> Vec<Outbound> {
        match self.try_join(connection, room_id, name) {
            Ok(out) => out,
            Err(e) => {
                tracing::debug!(%connection, room_id, reason = %e, "join refused");
                vec![Outbound::new(connection, e.to_event())]
            }
        }
    }

    fn try_join(
        &mut self,
        connection: ConnectionId,
        room_id: &str,
        name: Option<&str>,
    ) -> Result<Vec<Outbound>, RoomError> {
        if let Some(current) = self.registry.current_room(connection) {
            return Err(RoomError::AlreadyInRoom(connection, current.to_owned()));
        }

        match self.rooms.get(room_id) {
            Some(room) if room.is_full() => {
                return Err(RoomError::RoomFull(room_id.to_owned()));
            }
            Some(_) => {}
            None => {
                if let Some(max) = self.config.max_rooms {
                    if self.rooms.len() >= max {
                        return Err(RoomError::AtCapacity(max));
                    }
                }
            }
        }

        let name = self.display_name(name);
        let now = Instant::now();
        let board_size = self.config.board_size;

        let room = self.rooms.entry(room_id.to_owned()).or_insert_with(|| {
            tracing::info!(room_id, board_size, "room created");
            Room::new(room_id, board_size, now)
        });
        let role = room.seat(connection, name.clone(), now)?;

        if let Err(e) = self.registry.assign(connection, room_id) {
            room.unseat(connection);
            if room.is_empty() {
                self.rooms.remove(room_id);
            }
            return Err(e.into());
        }

        tracing::info!(%connection, room_id, %role, name = %name, "player joined");

        let room = &self.rooms[room_id];
        let opponent = room
            .seats()
            .iter()
            .find(|s| s.connection != connection)
            .cloned();

        let mut out = vec![Outbound::new(
            connection,
            ServerEvent::RoomJoined(RoomJoined {
                color: role,
                current_turn: room.current_turn(),
                board: room.board().clone(),
                player_name: name.clone(),
                room_id: room_id.to_owned(),
                opponent_name: opponent.as_ref().map(|s| s.name.clone()),
            }),
        )];

        if let (Some(opponent), Some(player_names)) = (opponent, room.player_names()) {
            out.push(Outbound::new(
                opponent.connection,
                ServerEvent::OpponentJoined(OpponentJoined {
                    opponent_name: name,
                    opponent_color: role,
                }),
            ));

            let start = ServerEvent::StartGame(StartGame {
                current_turn: room.current_turn(),
                board: room.board().clone(),
                player_names,
                room_id: room_id.to_owned(),
            });
            out.extend(room.seats().iter().map(|s| Outbound::new(s.connection, start.clone())));

            tracing::info!(room_id, "game started");
        }

        Ok(out)
    }

    /// Trims the requested name; blank or default names get a
    /// `Player<N>` placeholder based on the live connection count.
    fn display_name(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(name) if !name.is_empty() && name != ANONYMOUS_NAME => name.to_owned(),
            _ => format!("Player{}", self.registry.len() + 1),
        }
    }

    // -----------------------------------------------------------------
    // move
    // -----------------------------------------------------------------

    /// Applies a move and broadcasts `move_made`, or answers the sender
    /// with `invalid_move`.
    ///
    /// A move naming a room that doesn't exist is dropped without a reply.
    pub fn make_move(
        &mut self,
        connection: ConnectionId,
        request: &MoveRequest,
    ) -> Vec<Outbound> {
        let Some(room) = self.rooms.get_mut(&request.room) else {
            tracing::debug!(%connection, room_id = %request.room, "move for unknown room dropped");
            return Vec::new();
        };

        match room.apply_move(connection, request, Instant::now()) {
            Ok(made) => {
                tracing::info!(
                    room_id = %request.room,
                    %connection,
                    row = made.row,
                    column = made.column,
                    next = %made.current_turn,
                    "move made"
                );
                let event = ServerEvent::MoveMade(made);
                room.seats()
                    .iter()
                    .map(|s| Outbound::new(s.connection, event.clone()))
                    .collect()
            }
            Err(e) => {
                tracing::debug!(
                    room_id = %request.room,
                    %connection,
                    reason = %e,
                    "invalid move"
                );
                vec![Outbound::new(
                    connection,
                    ServerEvent::InvalidMove(InvalidMove {
                        reason: e.to_string(),
                    }),
                )]
            }
        }
    }

    // -----------------------------------------------------------------
    // win
    // -----------------------------------------------------------------

    /// Relays a client-declared win to every seat as `game_over`.
    ///
    /// The payload is passed through untouched and the claim is not
    /// checked; deciding who won is the clients' job.
    pub fn win(&mut self, connection: ConnectionId, request: &WinRequest) -> Vec<Outbound> {
        let Some(room) = self.rooms.get(&request.room) else {
            tracing::debug!(%connection, room_id = %request.room, "win for unknown room dropped");
            return Vec::new();
        };

        let winner = Role::from_marker(request.winner).map_or("unknown", Role::label);
        tracing::info!(room_id = %request.room, %connection, winner, "game over");

        let event = ServerEvent::GameOver(request.payload.clone());
        room.seats()
            .iter()
            .map(|s| Outbound::new(s.connection, event.clone()))
            .collect()
    }

    // -----------------------------------------------------------------
    // disconnect
    // -----------------------------------------------------------------

    /// Removes a departing connection from its room and the registry.
    ///
    /// The remaining player, if any, gets `opponent_left`. A room left
    /// with no seats is removed immediately. Safe to call more than once.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Outbound> {
        let Some(room_id) = self.registry.clear(connection) else {
            return Vec::new();
        };

        let Some(room) = self.rooms.get_mut(&room_id) else {
            tracing::debug!(%connection, %room_id, "room already gone on disconnect");
            return Vec::new();
        };

        let Some(seat) = room.unseat(connection) else {
            return Vec::new();
        };

        tracing::info!(
            %connection,
            %room_id,
            role = %seat.role,
            name = %seat.name,
            "player left"
        );

        if let Some(remaining) = room.seats().first() {
            return vec![Outbound::new(
                remaining.connection,
                ServerEvent::OpponentLeft(OpponentLeft {
                    color: seat.role,
                    name: seat.name,
                }),
            )];
        }

        self.rooms.remove(&room_id);
        tracing::info!(%room_id, "room empty, removed");
        Vec::new()
    }

    // -----------------------------------------------------------------
    // idle reaping
    // -----------------------------------------------------------------

    /// Removes rooms idle for longer than the configured timeout.
    ///
    /// Seated connections get `room_expired` and are released so they can
    /// join again; they stay connected. Does nothing when no timeout is
    /// configured.
    pub fn reap_idle(&mut self, now: Instant) -> Vec<Outbound> {
        let Some(timeout) = self.config.idle_timeout else {
            return Vec::new();
        };

        let mut expired: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.is_idle(now, timeout))
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();

        let mut out = Vec::new();
        for room_id in expired {
            self.rooms.remove(&room_id);
            let released = self.registry.unassign_room(&room_id);
            tracing::info!(%room_id, seats = released.len(), "idle room reaped");
            out.extend(released.into_iter().map(|c| {
                Outbound::new(
                    c,
                    ServerEvent::RoomExpired {
                        room_id: room_id.clone(),
                    },
                )
            }));
        }
        out
    }

    // -----------------------------------------------------------------
    // queries
    // -----------------------------------------------------------------

    /// Looks up a room by identifier.
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// The room a connection is seated in, if any.
    pub fn current_room(&self, connection: ConnectionId) -> Option<&str> {
        self.registry.current_room(connection)
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of live connections, seated or not.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
