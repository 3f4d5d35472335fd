//! Registry entry and outbound handle types
//!
//! This module defines the per-connection state stored in the registry.

use std::time::Instant;

use tokio::sync::mpsc;

use crate::signaling::ServerMessage;

use super::connection::{ConnectionId, Role};

/// Item queued for a connection's socket writer
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialize and send a protocol message
    Message(ServerMessage),
    /// Close the transport after flushing earlier items
    Close,
}

/// Sending half of a connection's outbound queue
///
/// Cheap to clone. Sends never block and never fail loudly: a connection
/// whose writer has already gone simply misses the message, which is the
/// expected outcome when a disconnect races an in-flight relay.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver the socket writer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a message; returns false if the writer is gone
    pub fn send(&self, message: ServerMessage) -> bool {
        self.tx.send(Outbound::Message(message)).is_ok()
    }

    /// Ask the writer to close the transport
    pub fn close(&self) -> bool {
        self.tx.send(Outbound::Close).is_ok()
    }

    /// Whether the writer side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Entry for a single connection in the registry
#[derive(Debug)]
pub struct Connection {
    /// Connection id
    pub id: ConnectionId,

    /// Current role, changed only through `ConnectionRegistry::set_role`
    pub(super) role: Role,

    /// Outbound queue
    pub(super) handle: ConnectionHandle,

    /// When the connection was registered
    pub connected_at: Instant,

    /// Registration sequence number, unique per registry
    pub(super) seq: u64,
}

impl Connection {
    pub(super) fn new(id: ConnectionId, handle: ConnectionHandle, seq: u64) -> Self {
        Self {
            id,
            role: Role::Unassigned,
            handle,
            connected_at: Instant::now(),
            seq,
        }
    }

    /// Current role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Outbound handle
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Queue a message for this connection
    pub fn send(&self, message: ServerMessage) -> bool {
        self.handle.send(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_send_and_close() {
        let (handle, mut rx) = ConnectionHandle::channel();

        assert!(handle.send(ServerMessage::NoBroadcaster));
        assert!(handle.close());

        assert_eq!(
            rx.recv().await,
            Some(Outbound::Message(ServerMessage::NoBroadcaster))
        );
        assert_eq!(rx.recv().await, Some(Outbound::Close));
    }

    #[test]
    fn test_send_after_writer_dropped() {
        let (handle, rx) = ConnectionHandle::channel();
        drop(rx);

        assert!(handle.is_closed());
        assert!(!handle.send(ServerMessage::BroadcasterLeft));
    }
}
