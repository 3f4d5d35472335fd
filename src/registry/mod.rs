//! Connection registry
//!
//! Tracks every live signaling connection, its role, and the outbound queue
//! used to reach it. The registry is owned by the coordinator actor and is
//! never shared; other tasks reach a connection only through its
//! [`ConnectionHandle`].
//!
//! # Architecture
//!
//! ```text
//!                 ConnectionRegistry (actor-owned)
//!            ┌────────────────────────────────────┐
//!            │ HashMap<ConnectionId, Connection { │
//!            │     role,                          │
//!            │     handle: mpsc::UnboundedSender, │
//!            │ }>                                 │
//!            │ Vec<(seq, ConnectionId)>           │
//!            │     (registration order)           │
//!            └───────────────┬────────────────────┘
//!                            │ Outbound::{Message, Close}
//!          ┌─────────────────┼─────────────────┐
//!          ▼                 ▼                 ▼
//!     [socket task]     [socket task]     [socket task]
//!      ws writer         ws writer         ws writer
//! ```
//!
//! Sending never blocks the actor: outbound queues are unbounded and a send
//! to a connection whose socket task has already gone is silently dropped.

pub mod connection;
pub mod entry;
pub mod store;

pub use connection::{ConnectionId, Role};
pub use entry::{Connection, ConnectionHandle, Outbound};
pub use store::ConnectionRegistry;
