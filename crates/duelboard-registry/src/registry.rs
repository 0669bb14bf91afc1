//! The connection registry: connection → current room.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is NOT thread-safe by itself. It is a plain
//! `HashMap`. It is owned by the room manager, which in turn sits behind
//! a single lock in the server, so every read and write here already
//! happens inside one serialized operation.

use std::collections::HashMap;

use duelboard_transport::ConnectionId;

use crate::RegistryError;

/// Maps each live connection to the room it is seated in.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ assign() ──→ clear()
///     │              │
///     ▼              ▼
/// [no room]     [in room] ──(room reaped)──→ [no room]
/// ```
///
/// The room reference is a lookup key only. The registry never owns or
/// inspects the room itself.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// `None` means connected but not seated anywhere.
    connections: HashMap<ConnectionId, Option<String>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new connection with no room assignment.
    ///
    /// Registering an id that is already known keeps its current
    /// assignment.
    pub fn register(&mut self, connection: ConnectionId) {
        self.connections.entry(connection).or_insert(None);
        tracing::debug!(%connection, total = self.connections.len(), "connection registered");
    }

    /// Returns the room the connection is seated in, if any.
    pub fn current_room(&self, connection: ConnectionId) -> Option<&str> {
        self.connections
            .get(&connection)
            .and_then(|room| room.as_deref())
    }

    /// Returns `true` if the connection is registered (seated or not).
    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.connections.contains_key(&connection)
    }

    /// Records that `connection` is seated in `room`.
    ///
    /// # Errors
    /// - [`RegistryError::AlreadySeated`] if the connection already has a
    ///   room. The existing assignment is left untouched.
    /// - [`RegistryError::NotRegistered`] if the connection is unknown.
    pub fn assign(
        &mut self,
        connection: ConnectionId,
        room: &str,
    ) -> Result<(), RegistryError> {
        let slot = self
            .connections
            .get_mut(&connection)
            .ok_or(RegistryError::NotRegistered(connection))?;

        if let Some(existing) = slot {
            return Err(RegistryError::AlreadySeated(connection, existing.clone()));
        }

        *slot = Some(room.to_owned());
        tracing::info!(%connection, room_id = room, "connection assigned to room");
        Ok(())
    }

    /// Removes the connection entirely, returning the room it was in.
    ///
    /// Clearing an unknown connection is a no-op.
    pub fn clear(&mut self, connection: ConnectionId) -> Option<String> {
        let room = self.connections.remove(&connection).flatten();
        tracing::debug!(%connection, room_id = ?room, "connection cleared");
        room
    }

    /// Drops the room assignment of every connection seated in `room`.
    ///
    /// The connections stay registered and may join again. Returns the
    /// connections that were released.
    pub fn unassign_room(&mut self, room: &str) -> Vec<ConnectionId> {
        let mut released = Vec::new();
        for (connection, slot) in self.connections.iter_mut() {
            if slot.as_deref() == Some(room) {
                *slot = None;
                released.push(*connection);
            }
        }
        released.sort();
        released
    }

    /// Number of live connections, seated or not.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
