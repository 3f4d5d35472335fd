//! Signaling coordinator
//!
//! A single actor task owns the [`ConnectionRegistry`], the
//! [`BroadcasterSlot`] and the [`MediaBridge`]. Socket tasks talk to it
//! through the cloneable [`Coordinator`] handle; every mutation of shared
//! state is a [`Command`] processed one at a time.
//!
//! ```text
//!   socket task ──┐                         ┌──► Outbound queues
//!   socket task ──┼─► mpsc<Command> ─► actor ┤
//!   HTTP status ──┘        ▲                └──► MediaBridge ──► ffmpeg
//!                          │                          │
//!                          └──── BridgeEvent ◄────────┘
//! ```
//!
//! [`ConnectionRegistry`]: crate::registry::ConnectionRegistry
//! [`MediaBridge`]: crate::bridge::MediaBridge

pub mod actor;
pub mod handler;
pub mod router;
pub mod slot;
pub mod state;

pub use actor::{Command, Coordinator};
pub use slot::BroadcasterSlot;
pub use state::CoordinatorState;
