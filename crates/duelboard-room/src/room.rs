//! A single room: two seats, a board, and whose turn it is.

use std::time::{Duration, Instant};

use duelboard_protocol::{Board, MoveMade, MoveRequest, PlayerNames, Role};
use duelboard_transport::ConnectionId;

use crate::{MoveError, RoomError};

/// Maximum occupants of a room.
pub const SEATS_PER_ROOM: usize = 2;

/// One occupied role slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub role: Role,
    pub connection: ConnectionId,
    pub name: String,
}

/// One two-player session.
///
/// Seats are kept in join order. The two seats never share a role: a
/// newcomer always takes whichever role is vacant, so a player who joins
/// a room whose first occupant already left becomes `First` again.
#[derive(Debug)]
pub struct Room {
    id: String,
    seats: Vec<Seat>,
    current_turn: Role,
    board: Board,
    last_activity: Instant,
}

impl Room {
    /// Creates an empty room with `First` to move.
    pub fn new(id: impl Into<String>, board_size: usize, now: Instant) -> Self {
        Self {
            id: id.into(),
            seats: Vec::with_capacity(SEATS_PER_ROOM),
            current_turn: Role::First,
            board: Board::new(board_size),
            last_activity: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Occupied seats in join order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn current_turn(&self) -> Role {
        self.current_turn
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Last join or accepted move.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= SEATS_PER_ROOM
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// The seat held by `connection`, if any.
    pub fn seat_of(&self, connection: ConnectionId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.connection == connection)
    }

    /// The seat holding `role`, if any.
    pub fn seat_for(&self, role: Role) -> Option<&Seat> {
        self.seats.iter().find(|s| s.role == role)
    }

    /// The role the next joiner would get, or `None` when full.
    pub fn vacant_role(&self) -> Option<Role> {
        match self.seats.as_slice() {
            [] => Some(Role::First),
            [only] => Some(only.role.opponent()),
            _ => None,
        }
    }

    /// Role → display name, once both seats are filled.
    pub fn player_names(&self) -> Option<PlayerNames> {
        let first = self.seat_for(Role::First)?;
        let second = self.seat_for(Role::Second)?;
        Some(PlayerNames {
            first: first.name.clone(),
            second: second.name.clone(),
        })
    }

    /// Returns `true` if nothing happened in the room for `timeout`.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) >= timeout
    }

    /// Seats `connection` in the vacant role.
    pub(crate) fn seat(
        &mut self,
        connection: ConnectionId,
        name: String,
        now: Instant,
    ) -> Result<Role, RoomError> {
        let role = self
            .vacant_role()
            .ok_or_else(|| RoomError::RoomFull(self.id.clone()))?;
        self.seats.push(Seat {
            role,
            connection,
            name,
        });
        self.last_activity = now;
        Ok(role)
    }

    /// Removes the seat held by `connection` and returns it.
    pub(crate) fn unseat(&mut self, connection: ConnectionId) -> Option<Seat> {
        let index = self.seats.iter().position(|s| s.connection == connection)?;
        Some(self.seats.remove(index))
    }

    /// Validates and applies a move.
    ///
    /// Checks run in this order and the first failure wins: the player
    /// value names a role, that role holds the turn, the sender holds that
    /// role's seat, the cell is on the board, the cell is empty. On any
    /// failure the room is left exactly as it was.
    pub(crate) fn apply_move(
        &mut self,
        connection: ConnectionId,
        request: &MoveRequest,
        now: Instant,
    ) -> Result<MoveMade, MoveError> {
        let role = Role::from_marker(request.player)
            .ok_or(MoveError::UnknownRole(request.player))?;

        if role != self.current_turn {
            return Err(MoveError::NotYourTurn {
                attempted: role,
                current: self.current_turn,
            });
        }

        match self.seat_of(connection) {
            None => return Err(MoveError::NotSeated),
            Some(seat) if seat.role != role => {
                return Err(MoveError::NotYourSeat(role));
            }
            Some(_) => {}
        }

        let size = self.board.size();
        let (row, column) = match (
            usize::try_from(request.row),
            usize::try_from(request.column),
        ) {
            (Ok(row), Ok(column)) if row < size && column < size => (row, column),
            _ => {
                return Err(MoveError::OutOfBounds {
                    row: request.row,
                    column: request.column,
                    size,
                });
            }
        };

        let marker = role.marker();
        if !self.board.place(row, column, marker) {
            return Err(MoveError::CellOccupied { row, column });
        }

        self.current_turn = role.opponent();
        self.last_activity = now;

        Ok(MoveMade {
            row,
            column,
            player: marker,
            board: self.board.clone(),
            current_turn: self.current_turn,
        })
    }
}
