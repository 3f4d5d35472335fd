//! Broadcaster slot
//!
//! Holds at most one broadcaster. Claiming an occupied slot evicts the
//! previous holder before the new claim becomes visible.

use crate::registry::{ConnectionId, Role};
use crate::signaling::ServerMessage;

use super::state::CoordinatorState;

/// Reason sent to an evicted broadcaster
pub const EVICTION_REASON: &str = "New broadcaster connected";

/// Single-writer register for the broadcaster id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcasterSlot {
    /// No broadcaster
    #[default]
    Empty,
    /// The broadcaster's connection id
    Occupied(ConnectionId),
}

impl BroadcasterSlot {
    /// Current broadcaster, if any
    pub fn current(&self) -> Option<ConnectionId> {
        match *self {
            BroadcasterSlot::Empty => None,
            BroadcasterSlot::Occupied(id) => Some(id),
        }
    }

    /// Whether `id` is the current broadcaster
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.current() == Some(id)
    }

    /// Whether the slot is occupied
    pub fn is_occupied(&self) -> bool {
        matches!(self, BroadcasterSlot::Occupied(_))
    }
}

impl CoordinatorState {
    /// Make `id` the broadcaster
    ///
    /// An existing broadcaster other than `id` receives `force-disconnect`,
    /// has its transport closed and loses its role, and the bridge is
    /// stopped, all before the slot changes hands. Every other connection is
    /// then told a broadcaster is available, and the new broadcaster learns
    /// about each viewer already waiting.
    pub fn claim(&mut self, id: ConnectionId) {
        if !self.registry.contains(id) {
            tracing::debug!(connection_id = %id, "Claim from unknown connection ignored");
            return;
        }

        if let Some(prev) = self.slot.current() {
            if prev != id {
                self.evict(prev);
            }
        }

        self.slot = BroadcasterSlot::Occupied(id);
        // Set before listing viewers so a former viewer is not its own viewer
        self.registry.set_role(id, Role::Broadcaster);

        tracing::info!(connection_id = %id, "Broadcaster connected");

        self.registry
            .broadcast_except(id, &ServerMessage::BroadcasterAvailable);

        for viewer_id in self.registry.list_by_role(Role::Viewer) {
            self.registry
                .send(id, ServerMessage::NewViewer { viewer_id });
        }
    }

    /// Vacate the slot if `id` holds it
    ///
    /// Stops the bridge and tells viewers the broadcaster left. Returns false
    /// (and does nothing) for any other id, which makes stale releases from
    /// racing disconnects harmless.
    pub fn release(&mut self, id: ConnectionId) -> bool {
        if !self.slot.is_current(id) {
            tracing::debug!(
                connection_id = %id,
                current = ?self.slot.current(),
                "Release for non-current broadcaster ignored"
            );
            return false;
        }

        self.slot = BroadcasterSlot::Empty;
        self.bridge.stop();
        self.registry.set_role(id, Role::Unassigned);

        tracing::info!(connection_id = %id, "Broadcaster disconnected");

        self.registry
            .broadcast_to_role(Role::Viewer, Some(id), &ServerMessage::BroadcasterLeft);
        true
    }

    fn evict(&mut self, prev: ConnectionId) {
        tracing::info!(connection_id = %prev, "Evicting broadcaster");

        self.registry.send(
            prev,
            ServerMessage::ForceDisconnect {
                reason: EVICTION_REASON.to_owned(),
            },
        );
        self.registry.close(prev);
        self.registry.set_role(prev, Role::Unassigned);
        self.slot = BroadcasterSlot::Empty;
        self.bridge.stop();
    }
}
