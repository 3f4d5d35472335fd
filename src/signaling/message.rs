//! Inbound and outbound signaling messages

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ConnectionId;

use super::target::Target;

/// Event received from a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Claim the broadcaster slot, evicting any current holder
    JoinAsBroadcaster,

    /// Subscribe as a viewer
    JoinAsViewer,

    /// SDP offer for another connection
    Offer {
        /// Destination
        target: Target,
        /// Session description, relayed verbatim
        sdp: Value,
    },

    /// SDP answer for another connection
    Answer {
        /// Destination
        target: Target,
        /// Session description, relayed verbatim
        sdp: Value,
    },

    /// Trickled ICE candidate for another connection
    IceCandidate {
        /// Destination
        target: Target,
        /// Candidate, relayed verbatim
        candidate: Value,
    },

    /// Start the RTMP bridge (broadcaster only)
    StartStreamToRtmp,

    /// Stop the RTMP bridge (broadcaster only)
    StopStreamToRtmp,

    /// Recorded media chunk for the RTMP bridge (broadcaster only)
    ///
    /// Carried in binary frames, never in JSON.
    #[serde(skip_deserializing)]
    StreamData(Bytes),
}

impl ClientEvent {
    /// Parse a JSON text frame
    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Wrap a binary frame
    pub fn from_binary(data: impl Into<Bytes>) -> Self {
        ClientEvent::StreamData(data.into())
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinAsBroadcaster => "join-as-broadcaster",
            ClientEvent::JoinAsViewer => "join-as-viewer",
            ClientEvent::Offer { .. } => "offer",
            ClientEvent::Answer { .. } => "answer",
            ClientEvent::IceCandidate { .. } => "ice-candidate",
            ClientEvent::StartStreamToRtmp => "start-stream-to-rtmp",
            ClientEvent::StopStreamToRtmp => "stop-stream-to-rtmp",
            ClientEvent::StreamData(_) => "stream-data",
        }
    }

    /// Whether only the current broadcaster may send this event
    pub fn requires_broadcaster(&self) -> bool {
        matches!(
            self,
            ClientEvent::StreamData(_)
                | ClientEvent::StartStreamToRtmp
                | ClientEvent::StopStreamToRtmp
        )
    }
}

/// Event sent to a client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Greeting carrying the connection's own id
    Connected {
        /// Id assigned to the receiving connection
        id: ConnectionId,
    },

    /// A broadcaster is live
    BroadcasterAvailable,

    /// No broadcaster is live
    NoBroadcaster,

    /// The broadcaster went away
    BroadcasterLeft,

    /// Sent to the broadcaster when a viewer joins
    NewViewer {
        /// The joining viewer
        #[serde(rename = "viewerId")]
        viewer_id: ConnectionId,
    },

    /// Snapshot of the other viewers, sent to a joining viewer
    OtherViewers(Vec<ConnectionId>),

    /// Sent to existing viewers when a viewer joins
    NewPeer {
        /// The joining viewer
        #[serde(rename = "peerId")]
        peer_id: ConnectionId,
    },

    /// A non-broadcaster connection went away
    PeerLeft {
        /// The departed connection
        #[serde(rename = "peerId")]
        peer_id: ConnectionId,
    },

    /// The receiving broadcaster was evicted; the transport closes next
    ForceDisconnect {
        /// Human-readable reason
        reason: String,
    },

    /// Relayed SDP offer
    Offer {
        /// Session description as sent
        sdp: Value,
        /// Originating connection, stamped by the server
        sender: ConnectionId,
    },

    /// Relayed SDP answer
    Answer {
        /// Session description as sent
        sdp: Value,
        /// Originating connection, stamped by the server
        sender: ConnectionId,
    },

    /// Relayed ICE candidate
    IceCandidate {
        /// Candidate as sent
        candidate: Value,
        /// Originating connection, stamped by the server
        sender: ConnectionId,
    },

    /// Acknowledges `start-stream-to-rtmp`
    RtmpStreamStarted,

    /// Acknowledges `stop-stream-to-rtmp`
    RtmpStreamStopped,
}

impl ServerMessage {
    /// Encode as a JSON text frame
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_unit_events() {
        assert_eq!(
            ClientEvent::from_text(r#"{"event":"join-as-viewer"}"#).unwrap(),
            ClientEvent::JoinAsViewer
        );
        assert_eq!(
            ClientEvent::from_text(r#"{"event":"start-stream-to-rtmp"}"#).unwrap(),
            ClientEvent::StartStreamToRtmp
        );
    }

    #[test]
    fn test_parse_offer() {
        let text = r#"{"event":"offer","data":{"target":"broadcast","sdp":{"type":"offer","sdp":"v=0"}}}"#;
        let event = ClientEvent::from_text(text).unwrap();

        assert_eq!(
            event,
            ClientEvent::Offer {
                target: Target::Broadcaster,
                sdp: json!({"type": "offer", "sdp": "v=0"}),
            }
        );
    }

    #[test]
    fn test_client_sender_field_is_ignored() {
        let text = r#"{"event":"ice-candidate","data":{"target":"4","candidate":"c","sender":"99"}}"#;
        let event = ClientEvent::from_text(text).unwrap();

        assert_eq!(
            event,
            ClientEvent::IceCandidate {
                target: Target::Connection(ConnectionId::new(4)),
                candidate: json!("c"),
            }
        );
    }

    #[test]
    fn test_parse_numeric_target() {
        let text = r#"{"event":"answer","data":{"target":5,"sdp":{"type":"answer"}}}"#;
        let event = ClientEvent::from_text(text).unwrap();

        assert_eq!(
            event,
            ClientEvent::Answer {
                target: Target::Connection(ConnectionId::new(5)),
                sdp: json!({"type": "answer"}),
            }
        );
    }

    #[test]
    fn test_unknown_event_is_an_error() {
        assert!(ClientEvent::from_text(r#"{"event":"dance"}"#).is_err());
        assert!(ClientEvent::from_text(r#"{"event":"stream-data","data":[1,2]}"#).is_err());
        assert!(ClientEvent::from_text("not json").is_err());
    }

    #[test]
    fn test_privileged_events() {
        assert!(ClientEvent::from_binary(vec![1u8]).requires_broadcaster());
        assert!(ClientEvent::StopStreamToRtmp.requires_broadcaster());
        assert!(!ClientEvent::JoinAsBroadcaster.requires_broadcaster());
    }

    #[test]
    fn test_encode_server_messages() {
        let id = ConnectionId::new(5);

        assert_eq!(
            serde_json::to_value(ServerMessage::NoBroadcaster).unwrap(),
            json!({"event": "no-broadcaster"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::NewViewer { viewer_id: id }).unwrap(),
            json!({"event": "new-viewer", "data": {"viewerId": "5"}})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::OtherViewers(vec![id])).unwrap(),
            json!({"event": "other-viewers", "data": ["5"]})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Answer {
                sdp: json!("x"),
                sender: id
            })
            .unwrap(),
            json!({"event": "answer", "data": {"sdp": "x", "sender": "5"}})
        );
    }
}
