//! Coordinator actor and its handle

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::bridge::{BridgeConfig, BridgeEvent, Launcher, MediaBridge};
use crate::error::{Error, Result};
use crate::registry::{ConnectionHandle, ConnectionId};
use crate::signaling::ClientEvent;
use crate::stats::StatusSnapshot;

use super::state::CoordinatorState;

/// Default depth of the command queue
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

/// Request processed by the actor
#[derive(Debug)]
pub enum Command {
    /// A transport connected
    Connect {
        /// Allocated id
        id: ConnectionId,
        /// Outbound queue
        handle: ConnectionHandle,
    },
    /// An inbound protocol event
    Event {
        /// Originating connection
        id: ConnectionId,
        /// The event
        event: ClientEvent,
    },
    /// A transport closed
    Disconnect {
        /// The closed connection
        id: ConnectionId,
    },
    /// Read a status snapshot
    Status {
        /// Reply channel
        reply: oneshot::Sender<StatusSnapshot>,
    },
    /// Stop the actor and its bridge
    Shutdown,
}

impl CoordinatorState {
    /// Apply one command
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Connect { id, handle } => self.connect(id, handle),
            Command::Event { id, event } => self.dispatch(id, event),
            Command::Disconnect { id } => self.disconnect(id),
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown => {}
        }
    }
}

/// Cloneable handle to the coordinator actor
///
/// Commands from one handle are applied in the order they were sent, which
/// is what keeps a broadcaster's media chunks in order.
#[derive(Debug, Clone)]
pub struct Coordinator {
    commands: mpsc::Sender<Command>,
    next_id: Arc<AtomicU64>,
}

impl Coordinator {
    /// Spawn the actor with an idle bridge
    pub fn spawn(config: BridgeConfig, launcher: Arc<dyn Launcher>) -> (Self, JoinHandle<()>) {
        Self::spawn_with_capacity(config, launcher, DEFAULT_COMMAND_BUFFER)
    }

    /// Spawn the actor with a custom command queue depth
    pub fn spawn_with_capacity(
        config: BridgeConfig,
        launcher: Arc<dyn Launcher>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (bridge, bridge_events) = MediaBridge::new(config, launcher);
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let task = tokio::spawn(run(CoordinatorState::new(bridge), rx, bridge_events));

        let coordinator = Self {
            commands: tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };

        (coordinator, task)
    }

    /// Register a transport connection and return its id
    pub async fn connect(&self, handle: ConnectionHandle) -> Result<ConnectionId> {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Connect { id, handle }).await?;
        Ok(id)
    }

    /// Submit an inbound event from `id`
    pub async fn dispatch(&self, id: ConnectionId, event: ClientEvent) -> Result<()> {
        self.send(Command::Event { id, event }).await
    }

    /// Report that `id`'s transport closed
    pub async fn disconnect(&self, id: ConnectionId) -> Result<()> {
        self.send(Command::Disconnect { id }).await
    }

    /// Current status
    ///
    /// Also serves as a barrier: every command sent before this call has
    /// been applied when it returns.
    pub async fn status(&self) -> Result<StatusSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| Error::CoordinatorClosed)
    }

    /// Stop the actor
    ///
    /// Later calls on any handle fail with [`Error::CoordinatorClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::CoordinatorClosed)
    }
}

async fn run(
    mut state: CoordinatorState,
    mut commands: mpsc::Receiver<Command>,
    mut bridge_events: mpsc::UnboundedReceiver<BridgeEvent>,
) {
    tracing::debug!("Coordinator started");

    loop {
        tokio::select! {
            biased;

            Some(event) = bridge_events.recv() => {
                state.bridge_mut().handle_event(event);
            }
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => state.apply(command),
            },
        }
    }

    state.bridge_mut().shutdown();
    tracing::debug!("Coordinator stopped");
}
