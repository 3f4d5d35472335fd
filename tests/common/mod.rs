//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use broadcast_relay::bridge::{BridgeConfig, ChildProcess, Launcher, Spawned};
use broadcast_relay::registry::{ConnectionHandle, ConnectionId, Outbound};
use broadcast_relay::{BridgeState, Coordinator, ServerMessage};
use futures_util::future::BoxFuture;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, Notify};

/// Encoder stand-in that behaves like ffmpeg reading `pipe:0`
///
/// Each launch records everything written to its input and exits once the
/// input reaches EOF or the process is killed.
#[derive(Default)]
pub struct RecordingLauncher {
    pub spawns: AtomicUsize,
    pub kills: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    pub max_live: AtomicUsize,
    pub received: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingLauncher {
    pub fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Most processes ever alive at the same time
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    /// Bytes received by the `index`th process
    pub fn received(&self, index: usize) -> Vec<u8> {
        self.received.lock().unwrap()[index].clone()
    }
}

struct RecordingChild {
    exited: Arc<Notify>,
    kills: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl ChildProcess for RecordingChild {
    fn wait_exit(&mut self) -> BoxFuture<'_, io::Result<Option<i32>>> {
        let exited = Arc::clone(&self.exited);
        let live = Arc::clone(&self.live);
        Box::pin(async move {
            exited.notified().await;
            live.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(0))
        })
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.exited.notify_one();
        Ok(())
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self) -> io::Result<Spawned> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        let (input, mut output) = tokio::io::duplex(64 * 1024);
        let exited = Arc::new(Notify::new());

        let index = {
            let mut received = self.received.lock().unwrap();
            received.push(Vec::new());
            received.len() - 1
        };

        let received = Arc::clone(&self.received);
        let on_eof = Arc::clone(&exited);
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match output.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => received.lock().unwrap()[index].extend_from_slice(&buf[..n]),
                }
            }
            on_eof.notify_one();
        });

        Ok(Spawned::new(
            input,
            RecordingChild {
                exited,
                kills: Arc::clone(&self.kills),
                live: Arc::clone(&self.live),
            },
        ))
    }
}

/// Launcher whose spawns always fail
pub struct MissingEncoder;

impl Launcher for MissingEncoder {
    fn launch(&self) -> io::Result<Spawned> {
        Err(io::Error::new(io::ErrorKind::NotFound, "ffmpeg not installed"))
    }
}

pub fn test_bridge_config() -> BridgeConfig {
    BridgeConfig::with_output("rtmp://127.0.0.1:1935/live/test")
        .start_timeout(Duration::from_secs(5))
        .stop_timeout(Duration::from_secs(5))
}

pub fn spawn_coordinator(launcher: Arc<dyn Launcher>) -> Coordinator {
    let (coordinator, _task) = Coordinator::spawn(test_bridge_config(), launcher);
    coordinator
}

/// A connected test client
pub struct Client {
    pub id: ConnectionId,
    outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl Client {
    pub async fn connect(coordinator: &Coordinator) -> Self {
        let (handle, outbound) = ConnectionHandle::channel();
        let id = coordinator.connect(handle).await.unwrap();
        let mut client = Self { id, outbound };

        assert_eq!(client.next().await, Outbound::Message(ServerMessage::Connected { id }));
        client
    }

    /// Next queued item, failing the test if none arrives
    pub async fn next(&mut self) -> Outbound {
        tokio::time::timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("outbound queue closed")
    }

    /// Next queued protocol message
    pub async fn message(&mut self) -> ServerMessage {
        match self.next().await {
            Outbound::Message(message) => message,
            Outbound::Close => panic!("expected a message, got close"),
        }
    }

    /// Everything queued so far
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Ok(item) = self.outbound.try_recv() {
            items.push(item);
        }
        items
    }
}

/// Poll the status until the bridge reaches `state`
pub async fn wait_for_bridge(coordinator: &Coordinator, state: BridgeState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let status = coordinator.status().await.unwrap();
        if status.bridge_state == state {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "bridge stuck in {:?}, expected {:?}",
            status.bridge_state,
            state
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
