//! Connection lifecycle dispatch
//!
//! Maps each inbound event to a coordinator operation. Bridge control and
//! media chunks are accepted only from the current broadcaster; from anyone
//! else they are ignored.

use crate::registry::ConnectionId;
use crate::signaling::{ClientEvent, ServerMessage};

use super::router::RelayPayload;
use super::state::CoordinatorState;

impl CoordinatorState {
    /// Apply one inbound event from `id`
    pub fn dispatch(&mut self, id: ConnectionId, event: ClientEvent) {
        if event.requires_broadcaster() && !self.slot.is_current(id) {
            tracing::debug!(
                connection_id = %id,
                event = event.name(),
                "Broadcaster-only event from non-broadcaster ignored"
            );
            return;
        }

        match event {
            ClientEvent::JoinAsBroadcaster => self.claim(id),
            ClientEvent::JoinAsViewer => self.join_as_viewer(id),
            ClientEvent::Offer { target, sdp } => {
                self.relay(id, &target, RelayPayload::Offer(sdp));
            }
            ClientEvent::Answer { target, sdp } => {
                self.relay(id, &target, RelayPayload::Answer(sdp));
            }
            ClientEvent::IceCandidate { target, candidate } => {
                self.relay(id, &target, RelayPayload::IceCandidate(candidate));
            }
            ClientEvent::StreamData(chunk) => {
                if chunk.is_empty() {
                    return;
                }
                if self.bridge.state().is_idle() {
                    self.bridge.start();
                }
                self.bridge.data(chunk);
            }
            ClientEvent::StartStreamToRtmp => {
                tracing::info!(connection_id = %id, "RTMP stream requested");
                self.bridge.start();
                self.registry.send(id, ServerMessage::RtmpStreamStarted);
            }
            ClientEvent::StopStreamToRtmp => {
                tracing::info!(connection_id = %id, "RTMP stream stop requested");
                self.bridge.stop();
                self.registry.send(id, ServerMessage::RtmpStreamStopped);
            }
        }
    }
}
