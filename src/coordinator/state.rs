//! Coordinator state
//!
//! Everything the actor owns. Operations are split by concern across
//! `slot.rs` (claim/release), `router.rs` (join/relay/disconnect) and
//! `handler.rs` (event dispatch); they all take `&mut self`, so only one
//! runs at a time.

use crate::bridge::MediaBridge;
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Role};
use crate::signaling::ServerMessage;
use crate::stats::StatusSnapshot;

use super::slot::BroadcasterSlot;

/// Registry, slot and bridge, mutated only by the coordinator actor
#[derive(Debug)]
pub struct CoordinatorState {
    pub(super) registry: ConnectionRegistry,
    pub(super) slot: BroadcasterSlot,
    pub(super) bridge: MediaBridge,
}

impl CoordinatorState {
    /// Create state around an idle bridge
    pub fn new(bridge: MediaBridge) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            slot: BroadcasterSlot::Empty,
            bridge,
        }
    }

    /// Register a new transport connection and greet it with its id
    pub fn connect(&mut self, id: ConnectionId, handle: ConnectionHandle) {
        let conn = self.registry.register(id, handle);
        conn.send(ServerMessage::Connected { id });
        tracing::info!(connection_id = %id, "New connection");
    }

    /// Connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Broadcaster slot
    pub fn slot(&self) -> BroadcasterSlot {
        self.slot
    }

    /// RTMP bridge
    pub fn bridge(&self) -> &MediaBridge {
        &self.bridge
    }

    /// Mutable RTMP bridge, used by the actor to feed bridge events
    pub fn bridge_mut(&mut self) -> &mut MediaBridge {
        &mut self.bridge
    }

    /// Snapshot for the status endpoint
    pub fn status(&self) -> StatusSnapshot {
        let broadcaster_connected = self.slot.is_occupied();
        let viewer_count = self.registry.count_by_role(Role::Viewer);

        StatusSnapshot {
            broadcaster_connected,
            viewer_count,
            total_connections: viewer_count + usize::from(broadcaster_connected),
            bridge_state: self.bridge.state(),
        }
    }
}
