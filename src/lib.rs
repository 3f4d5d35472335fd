//! Single-broadcaster WebRTC signaling with an RTMP re-encoding bridge
//!
//! One connection at a time may hold the broadcaster role. Every other
//! connection is a viewer that negotiates a peer-to-peer session with the
//! broadcaster through the relay; SDP offers/answers and ICE candidates are
//! passed through untouched. The broadcaster may additionally push its
//! recorded media (WebM chunks) over the signaling socket, which is piped
//! into an ffmpeg subprocess and re-published as RTMP.
//!
//! # Architecture
//!
//! ```text
//!   WebSocket tasks (one per connection)
//!        │  Command::{Connect, Event, Disconnect}
//!        ▼
//!   ┌──────────────────────── coordinator actor ────────────────────────┐
//!   │ ConnectionRegistry   BroadcasterSlot   MediaBridge ◄── BridgeEvent │
//!   └──────┬──────────────────────────────────────┬─────────────────────┘
//!          │ Outbound (unbounded mpsc)            │ Bytes (ordered mpsc)
//!          ▼                                      ▼
//!   per-connection writers                   ffmpeg stdin ──► rtmp://…
//! ```
//!
//! All mutations of the registry, the slot and the bridge happen inside the
//! single actor task, so two connections can never be promoted at once and
//! two ffmpeg processes are never spawned concurrently.

pub mod bridge;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod server;
pub mod signaling;
pub mod stats;

pub use bridge::{BridgeConfig, BridgeState, FfmpegLauncher, MediaBridge};
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use registry::{ConnectionId, ConnectionRegistry, Role};
pub use server::{ServerConfig, SignalingServer, TlsConfig};
pub use signaling::{ClientEvent, ServerMessage, Target};
pub use stats::StatusSnapshot;
