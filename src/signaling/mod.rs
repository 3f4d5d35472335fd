//! Signaling wire protocol
//!
//! Text frames carry JSON events of the form
//! `{"event": "<kebab-case-name>", "data": {...}}`. Media chunks for the
//! RTMP bridge travel as binary frames and surface as
//! [`ClientEvent::StreamData`].
//!
//! SDP payloads and ICE candidates are opaque JSON values: they are relayed
//! exactly as received and never inspected.

pub mod message;
pub mod target;

pub use message::{ClientEvent, ServerMessage};
pub use target::Target;
