//! Signaling router
//!
//! Viewer admission, addressed relay of SDP/ICE payloads, and departure
//! notices. Relaying is a pure pass-through: it resolves an id and queues
//! a message, never touching roles or the slot.

use serde_json::Value;

use crate::registry::{ConnectionId, Role};
use crate::signaling::{ServerMessage, Target};

use super::state::CoordinatorState;

/// Payload of a relayed message
#[derive(Debug, Clone, PartialEq)]
pub enum RelayPayload {
    /// SDP offer
    Offer(Value),
    /// SDP answer
    Answer(Value),
    /// ICE candidate
    IceCandidate(Value),
}

impl RelayPayload {
    /// Wire name of the payload
    pub fn kind(&self) -> &'static str {
        match self {
            RelayPayload::Offer(_) => "offer",
            RelayPayload::Answer(_) => "answer",
            RelayPayload::IceCandidate(_) => "ice-candidate",
        }
    }

    /// Build the delivered message with the server-assigned sender
    fn stamp(self, sender: ConnectionId) -> ServerMessage {
        match self {
            RelayPayload::Offer(sdp) => ServerMessage::Offer { sdp, sender },
            RelayPayload::Answer(sdp) => ServerMessage::Answer { sdp, sender },
            RelayPayload::IceCandidate(candidate) => {
                ServerMessage::IceCandidate { candidate, sender }
            }
        }
    }
}

impl CoordinatorState {
    /// Admit `id` as a viewer
    ///
    /// The viewer learns whether a broadcaster is live and which other
    /// viewers exist; the broadcaster (if any) is told about the new viewer
    /// so it can start the peer connection, and existing viewers receive
    /// `new-peer`.
    pub fn join_as_viewer(&mut self, id: ConnectionId) {
        if !self.registry.contains(id) {
            tracing::debug!(connection_id = %id, "Join from unknown connection ignored");
            return;
        }

        if self.slot.is_current(id) {
            self.release(id);
        }
        self.registry.set_role(id, Role::Viewer);

        tracing::info!(connection_id = %id, "Viewer connected");

        match self.slot.current() {
            Some(broadcaster) => {
                self.registry.send(id, ServerMessage::BroadcasterAvailable);
                self.registry
                    .send(broadcaster, ServerMessage::NewViewer { viewer_id: id });
            }
            None => {
                self.registry.send(id, ServerMessage::NoBroadcaster);
            }
        }

        let others: Vec<ConnectionId> = self
            .registry
            .list_by_role(Role::Viewer)
            .into_iter()
            .filter(|other| *other != id)
            .collect();

        for other in &others {
            self.registry
                .send(*other, ServerMessage::NewPeer { peer_id: id });
        }
        self.registry.send(id, ServerMessage::OtherViewers(others));
    }

    /// Resolve a relay target to a live connection
    pub fn resolve(&self, target: &Target) -> Option<ConnectionId> {
        match target {
            Target::Broadcaster => self.slot.current(),
            Target::Connection(id) => self.registry.contains(*id).then_some(*id),
            Target::Unresolvable(_) => None,
        }
    }

    /// Deliver `payload` from `sender` to `target`
    ///
    /// Unresolved targets are dropped without telling the sender. Returns
    /// whether the message was queued.
    pub fn relay(&self, sender: ConnectionId, target: &Target, payload: RelayPayload) -> bool {
        let kind = payload.kind();

        let Some(recipient) = self.resolve(target) else {
            tracing::debug!(
                sender = %sender,
                target = %target,
                kind = kind,
                "Relay target not found, dropped"
            );
            return false;
        };

        tracing::debug!(sender = %sender, target = %recipient, kind = kind, "Relaying");
        self.registry.send(recipient, payload.stamp(sender))
    }

    /// Handle a transport close
    ///
    /// The broadcaster's departure vacates the slot (viewers get
    /// `broadcaster-left`); anyone else's produces `peer-left` for all
    /// remaining connections. Either way the registry entry is removed.
    /// A second call for the same id does nothing.
    pub fn disconnect(&mut self, id: ConnectionId) {
        if self.slot.is_current(id) {
            self.release(id);
            self.registry.remove(id);
            return;
        }

        if let Some(conn) = self.registry.remove(id) {
            tracing::info!(
                connection_id = %id,
                role = %conn.role(),
                duration = ?conn.connected_at.elapsed(),
                "Disconnected"
            );
            self.registry
                .broadcast_except(id, &ServerMessage::PeerLeft { peer_id: id });
        }
    }
}
