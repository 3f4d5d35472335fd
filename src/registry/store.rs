//! Connection registry implementation
//!
//! Map from connection id to [`Connection`], plus a registration log that
//! keeps role listings in the order connections were registered. Owned by
//! the coordinator actor, so no interior locking is needed here.

use std::collections::HashMap;

use crate::signaling::ServerMessage;

use super::connection::{ConnectionId, Role};
use super::entry::{Connection, ConnectionHandle};

/// Registry of all live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    /// `(seq, id)` in registration order; entries whose seq no longer
    /// matches the live connection are dead and skipped
    order: Vec<(u64, ConnectionId)>,
    next_seq: u64,
    dead: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection with role `Unassigned`
    ///
    /// Registering an id twice replaces the handle and resets the role.
    pub fn register(&mut self, id: ConnectionId, handle: ConnectionHandle) -> &Connection {
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.connections.contains_key(&id) {
            tracing::warn!(connection_id = %id, "Connection id registered twice");
            self.dead += 1;
        }
        self.connections.insert(id, Connection::new(id, handle, seq));
        self.order.push((seq, id));
        &self.connections[&id]
    }

    /// Set the role of a connection
    ///
    /// Returns false if the id is unknown.
    pub fn set_role(&mut self, id: ConnectionId, role: Role) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) => {
                if conn.role != role {
                    tracing::debug!(
                        connection_id = %id,
                        from = %conn.role,
                        to = %role,
                        "Role changed"
                    );
                    conn.role = role;
                }
                true
            }
            None => false,
        }
    }

    /// Look up a connection
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Check whether a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Remove a connection
    ///
    /// Removing an unknown id is a no-op, so repeated disconnect delivery is
    /// harmless.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(&id)?;
        self.dead += 1;
        if self.dead > self.connections.len() {
            self.compact();
        }
        Some(removed)
    }

    /// Ids holding `role`, in registration order
    pub fn list_by_role(&self, role: Role) -> Vec<ConnectionId> {
        self.order
            .iter()
            .filter_map(|&(seq, id)| self.connections.get(&id).filter(|conn| conn.seq == seq))
            .filter(|conn| conn.role == role)
            .map(|conn| conn.id)
            .collect()
    }

    /// Number of connections holding `role`
    pub fn count_by_role(&self, role: Role) -> usize {
        self.connections
            .values()
            .filter(|conn| conn.role == role)
            .count()
    }

    /// Total number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drop dead entries from the registration log
    fn compact(&mut self) {
        let connections = &self.connections;
        self.order
            .retain(|&(seq, id)| connections.get(&id).is_some_and(|conn| conn.seq == seq));
        self.dead = 0;
    }

    /// Queue a message for one connection
    ///
    /// Returns false if the id is unknown or its writer is gone.
    pub fn send(&self, id: ConnectionId, message: ServerMessage) -> bool {
        self.connections
            .get(&id)
            .map(|conn| conn.send(message))
            .unwrap_or(false)
    }

    /// Ask a connection's writer to close its transport
    pub fn close(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .map(|conn| conn.handle.close())
            .unwrap_or(false)
    }

    /// Send a message to every connection except `exclude`
    ///
    /// Returns the number of connections the message was queued for.
    pub fn broadcast_except(&self, exclude: ConnectionId, message: &ServerMessage) -> usize {
        self.connections
            .values()
            .filter(|conn| conn.id != exclude)
            .filter(|conn| conn.send(message.clone()))
            .count()
    }

    /// Send a message to every connection holding `role`, except `exclude`
    pub fn broadcast_to_role(
        &self,
        role: Role,
        exclude: Option<ConnectionId>,
        message: &ServerMessage,
    ) -> usize {
        self.connections
            .values()
            .filter(|conn| conn.role == role && Some(conn.id) != exclude)
            .filter(|conn| conn.send(message.clone()))
            .count()
    }
}
