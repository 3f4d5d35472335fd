//! Bridge state machine
//!
//! [`MediaBridge`] is owned by the coordinator actor. Its methods never
//! block: spawning, waiting and killing happen in tasks whose outcomes come
//! back as [`BridgeEvent`]s on the channel returned by [`MediaBridge::new`],
//! which the actor feeds into [`MediaBridge::handle_event`].

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::stats::BridgeStats;

use super::config::BridgeConfig;
use super::error::BridgeError;
use super::pipe::{monitor_exit, pump_input};
use super::process::{Launcher, Spawned};

/// Lifecycle state of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeState {
    /// No subprocess
    Idle,
    /// Spawn requested, not yet confirmed
    Starting,
    /// Subprocess running and accepting data
    Streaming,
    /// Input closed, waiting for the subprocess to exit
    Stopping,
    /// Last start attempt failed; passes straight through to Idle
    Failed,
}

impl BridgeState {
    /// Whether a start request would spawn a new process
    pub fn is_idle(self) -> bool {
        matches!(self, BridgeState::Idle | BridgeState::Failed)
    }
}

/// Completion signals from the tasks attached to a spawn
#[derive(Debug)]
pub enum BridgeEvent {
    /// The launcher produced a process
    Started {
        /// Spawn generation
        generation: u64,
        /// The new process
        spawned: Spawned,
    },
    /// The launcher failed
    SpawnFailed {
        /// Spawn generation
        generation: u64,
        /// Launch error
        error: io::Error,
    },
    /// The start timeout elapsed
    StartTimedOut {
        /// Spawn generation
        generation: u64,
    },
    /// Writing to the process input failed
    WriteFailed {
        /// Spawn generation
        generation: u64,
        /// Write error
        error: io::Error,
    },
    /// The graceful stop timeout elapsed
    StopTimedOut {
        /// Spawn generation
        generation: u64,
    },
    /// The process exited
    Exited {
        /// Spawn generation
        generation: u64,
        /// Exit code, or the error from waiting
        status: io::Result<Option<i32>>,
    },
}

impl BridgeEvent {
    /// Generation the event belongs to
    pub fn generation(&self) -> u64 {
        match self {
            BridgeEvent::Started { generation, .. }
            | BridgeEvent::SpawnFailed { generation, .. }
            | BridgeEvent::StartTimedOut { generation }
            | BridgeEvent::WriteFailed { generation, .. }
            | BridgeEvent::StopTimedOut { generation }
            | BridgeEvent::Exited { generation, .. } => *generation,
        }
    }
}

/// Handles to the tasks of the running process
struct ProcessLink {
    /// Chunk queue feeding the input pump; dropped to close stdin
    input: Option<mpsc::Sender<Bytes>>,
    /// Kill switch for the exit monitor
    kill: Option<oneshot::Sender<()>>,
}

impl ProcessLink {
    fn kill(&mut self) {
        self.input = None;
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }
}

/// RTMP bridge state machine
pub struct MediaBridge {
    config: BridgeConfig,
    launcher: Arc<dyn Launcher>,
    events: mpsc::UnboundedSender<BridgeEvent>,
    state: BridgeState,
    generation: u64,
    link: Option<ProcessLink>,
    /// The current generation's launch has not reported back yet
    spawning: bool,
    /// Abandoned generations whose process may still be alive
    lingering: usize,
    restart_pending: bool,
    last_failure: Option<BridgeError>,
    stats: BridgeStats,
}

impl MediaBridge {
    /// Create an idle bridge
    ///
    /// Returns the bridge and the receiver its events arrive on.
    pub fn new(
        config: BridgeConfig,
        launcher: Arc<dyn Launcher>,
    ) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (events, rx) = mpsc::unbounded_channel();

        let bridge = Self {
            config,
            launcher,
            events,
            state: BridgeState::Idle,
            generation: 0,
            link: None,
            spawning: false,
            lingering: 0,
            restart_pending: false,
            last_failure: None,
            stats: BridgeStats::new(),
        };

        (bridge, rx)
    }

    /// Current state
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Counters
    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// The most recent failure, if any
    pub fn last_failure(&self) -> Option<&BridgeError> {
        self.last_failure.as_ref()
    }

    /// Request a subprocess
    ///
    /// No-op while Starting or Streaming. While Stopping, or while an
    /// abandoned process has not exited yet, the request is remembered and
    /// served once the old process is gone.
    pub fn start(&mut self) {
        match self.state {
            BridgeState::Idle | BridgeState::Failed if self.lingering == 0 => self.spawn(),
            BridgeState::Idle | BridgeState::Failed => {
                tracing::debug!(
                    lingering = self.lingering,
                    "Previous encoder still exiting, start deferred"
                );
                self.restart_pending = true;
            }
            BridgeState::Starting | BridgeState::Streaming => {
                tracing::debug!(state = ?self.state, "Encoder already running");
            }
            BridgeState::Stopping => {
                tracing::debug!("Encoder still stopping, start deferred");
                self.restart_pending = true;
            }
        }
    }

    /// Request the subprocess to stop
    ///
    /// Streaming: stdin is closed so ffmpeg can flush, with a kill after
    /// `stop_timeout`. Starting: the bridge waits in Stopping for the
    /// pending launch and kills whatever it produces. Idle or Stopping:
    /// no-op.
    pub fn stop(&mut self) {
        self.restart_pending = false;

        match self.state {
            BridgeState::Idle | BridgeState::Failed | BridgeState::Stopping => {}
            BridgeState::Starting => {
                tracing::info!(generation = self.generation, "Encoder start cancelled");
                self.state = BridgeState::Stopping;
            }
            BridgeState::Streaming => {
                tracing::info!(generation = self.generation, "Stopping encoder");
                if let Some(link) = self.link.as_mut() {
                    link.input = None;
                }
                self.state = BridgeState::Stopping;
                self.schedule(
                    self.config.stop_timeout,
                    BridgeEvent::StopTimedOut {
                        generation: self.generation,
                    },
                );
            }
        }
    }

    /// Feed a chunk to the subprocess
    ///
    /// Chunks arriving in any state other than Streaming are dropped, as are
    /// chunks that find the input queue full.
    pub fn data(&mut self, chunk: Bytes) {
        if self.state != BridgeState::Streaming {
            self.stats.record_dropped();
            tracing::trace!(state = ?self.state, len = chunk.len(), "Chunk dropped");
            return;
        }

        let Some(input) = self.link.as_ref().and_then(|link| link.input.as_ref()) else {
            self.stats.record_dropped();
            return;
        };

        let len = chunk.len();
        match input.try_send(chunk) {
            Ok(()) => self.stats.record_written(len),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.record_overflow();
                tracing::debug!(
                    len = len,
                    overflowed = self.stats.chunks_overflowed,
                    "Encoder input full, chunk dropped"
                );
            }
            // The pump has already exited; its WriteFailed event is on the way
            Err(mpsc::error::TrySendError::Closed(_)) => self.stats.record_dropped(),
        }
    }

    /// Apply a completion signal
    pub fn handle_event(&mut self, event: BridgeEvent) {
        if event.generation() != self.generation {
            self.handle_stale(event);
            return;
        }

        match event {
            BridgeEvent::Started { spawned, .. } => {
                self.spawning = false;
                match self.state {
                    BridgeState::Starting => self.on_started(spawned),
                    _ => {
                        // Cancelled while launching; Exited finishes the stop
                        tracing::info!("Killing encoder from a cancelled start");
                        self.attach(spawned);
                        if let Some(link) = self.link.as_mut() {
                            link.kill();
                        }
                    }
                }
            }
            BridgeEvent::SpawnFailed { error, .. } => {
                self.spawning = false;
                match self.state {
                    BridgeState::Starting => self.fail(BridgeError::Spawn(error)),
                    BridgeState::Stopping => {
                        tracing::debug!(error = %error, "Cancelled encoder failed to start");
                        self.reset();
                        self.resume();
                    }
                    _ => {}
                }
            }
            BridgeEvent::StartTimedOut { .. } => match self.state {
                BridgeState::Starting => {
                    self.fail(BridgeError::StartTimeout(self.config.start_timeout));
                }
                BridgeState::Stopping if self.link.is_none() => {
                    tracing::warn!("Cancelled encoder never launched, giving up on it");
                    self.reset();
                    self.resume();
                }
                _ => {}
            },
            BridgeEvent::WriteFailed { error, .. } => {
                if self.state == BridgeState::Streaming {
                    self.stats.write_failures += 1;
                    tracing::error!(error = %error, "Encoder input closed");
                    self.last_failure = Some(BridgeError::Write(error));
                    self.reset();
                }
            }
            BridgeEvent::StopTimedOut { .. } => {
                if self.state == BridgeState::Stopping {
                    tracing::warn!(
                        timeout = ?self.config.stop_timeout,
                        "Encoder did not exit in time, killing"
                    );
                    if let Some(link) = self.link.as_mut() {
                        link.kill();
                    }
                }
            }
            BridgeEvent::Exited { status, .. } => self.on_exited(status),
        }
    }

    /// Kill any process and return to Idle, dropping pending requests
    pub fn shutdown(&mut self) {
        self.restart_pending = false;
        if !self.state.is_idle() {
            tracing::info!(state = ?self.state, "Bridge shutting down");
        }
        self.reset();
    }

    /// Events from abandoned generations only matter for reaping their process
    fn handle_stale(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Started {
                generation,
                mut spawned,
            } => {
                tracing::info!(generation = generation, "Killing encoder from an abandoned start");
                if let Err(e) = spawned.process.terminate() {
                    tracing::warn!(error = %e, "Failed to kill stale encoder");
                }
                let events = self.events.clone();
                tokio::spawn(async move {
                    let status = spawned.process.wait_exit().await;
                    let _ = events.send(BridgeEvent::Exited { generation, status });
                });
            }
            BridgeEvent::SpawnFailed { .. } | BridgeEvent::Exited { .. } => {
                self.lingering = self.lingering.saturating_sub(1);
                self.resume();
            }
            _ => {}
        }
    }

    fn spawn(&mut self) {
        self.generation += 1;
        self.state = BridgeState::Starting;
        self.spawning = true;
        self.restart_pending = false;

        let generation = self.generation;
        let launcher = Arc::clone(&self.launcher);
        let events = self.events.clone();

        tracing::info!(generation = generation, "Starting encoder");

        tokio::spawn(async move {
            let event = match launcher.launch() {
                Ok(spawned) => BridgeEvent::Started {
                    generation,
                    spawned,
                },
                Err(error) => BridgeEvent::SpawnFailed { generation, error },
            };
            let _ = events.send(event);
        });

        self.schedule(
            self.config.start_timeout,
            BridgeEvent::StartTimedOut { generation },
        );
    }

    /// Serve a deferred start once nothing from an older generation is alive
    fn resume(&mut self) {
        if self.restart_pending && self.state.is_idle() && self.lingering == 0 {
            self.spawn();
        }
    }

    fn attach(&mut self, spawned: Spawned) {
        let generation = self.generation;
        let (input_tx, input_rx) = mpsc::channel(self.config.input_buffer.max(1));
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(pump_input(
            generation,
            spawned.input,
            input_rx,
            self.events.clone(),
        ));
        tokio::spawn(monitor_exit(
            generation,
            spawned.process,
            kill_rx,
            self.events.clone(),
        ));

        self.link = Some(ProcessLink {
            input: Some(input_tx),
            kill: Some(kill_tx),
        });
    }

    fn on_started(&mut self, spawned: Spawned) {
        self.attach(spawned);
        self.state = BridgeState::Streaming;
        self.stats.sessions_started += 1;

        tracing::info!(generation = self.generation, "Encoder streaming");
    }

    fn on_exited(&mut self, status: io::Result<Option<i32>>) {
        // The process is gone, so there is nothing left to reap
        self.link = None;

        match self.state {
            BridgeState::Streaming => {
                let code = match status {
                    Ok(code) => code,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to wait on encoder");
                        None
                    }
                };
                tracing::warn!(code = ?code, "Encoder exited while streaming");
                self.last_failure = Some(BridgeError::Exited(code));
                self.reset();
            }
            BridgeState::Stopping => {
                tracing::info!(status = ?status, "Encoder stopped");
                self.reset();
                self.resume();
            }
            _ => {}
        }
    }

    fn fail(&mut self, error: BridgeError) {
        self.stats.spawn_failures += 1;
        tracing::error!(error = %error, "Encoder failed to start");
        self.state = BridgeState::Failed;
        self.last_failure = Some(error);
        self.reset();
    }

    /// Drop the process link and go Idle; later events of this generation
    /// only reap what it left behind
    fn reset(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.kill();
            self.lingering += 1;
        } else if self.spawning {
            self.lingering += 1;
        }
        self.spawning = false;
        self.generation += 1;
        self.state = BridgeState::Idle;
    }

    fn schedule(&self, after: std::time::Duration, event: BridgeEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(event);
        });
    }
}

impl std::fmt::Debug for MediaBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBridge")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("lingering", &self.lingering)
            .field("restart_pending", &self.restart_pending)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use futures_util::future::BoxFuture;
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio::sync::Notify;

    use super::*;
    use crate::bridge::ChildProcess;

    struct FakeChild {
        exited: Arc<Notify>,
        kills: Arc<AtomicUsize>,
        live: Arc<AtomicUsize>,
    }

    impl ChildProcess for FakeChild {
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

    #[derive(Default)]
    struct FakeLauncher {
        fail: bool,
        spawns: AtomicUsize,
        kills: Arc<AtomicUsize>,
        live: Arc<AtomicUsize>,
        max_live: AtomicUsize,
        exited: Arc<Notify>,
        outputs: Mutex<Vec<DuplexStream>>,
    }

    impl Launcher for FakeLauncher {
        fn launch(&self) -> io::Result<Spawned> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no encoder"));
            }
            self.spawns.fetch_add(1, Ordering::SeqCst);
            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(live, Ordering::SeqCst);
            let (input, output) = tokio::io::duplex(16);
            self.outputs.lock().unwrap().push(output);
            Ok(Spawned::new(
                input,
                FakeChild {
                    exited: Arc::clone(&self.exited),
                    kills: Arc::clone(&self.kills),
                    live: Arc::clone(&self.live),
                },
            ))
        }
    }

    fn bridge_with(
        launcher: &Arc<FakeLauncher>,
    ) -> (MediaBridge, mpsc::UnboundedReceiver<BridgeEvent>) {
        let config = BridgeConfig::default()
            .start_timeout(Duration::from_secs(30))
            .stop_timeout(Duration::from_secs(30))
            .input_buffer(4);
        MediaBridge::new(config, Arc::clone(launcher) as Arc<dyn Launcher>)
    }

    async fn pump(bridge: &mut MediaBridge, events: &mut mpsc::UnboundedReceiver<BridgeEvent>) {
        let event = events.recv().await.unwrap();
        bridge.handle_event(event);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, _events) = bridge_with(&launcher);

        bridge.stop();
        bridge.stop();

        assert_eq!(bridge.state(), BridgeState::Idle);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 0);
        assert_eq!(launcher.kills.load(Ordering::SeqCst), 0);
        assert!(bridge.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_start_then_stream() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        assert_eq!(bridge.state(), BridgeState::Starting);

        // Duplicate request while starting
        bridge.start();

        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Streaming);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 1);

        bridge.data(Bytes::from_static(b"hello "));
        bridge.data(Bytes::from_static(b"world"));
        bridge.stop();
        assert_eq!(bridge.state(), BridgeState::Stopping);

        let mut output = launcher.outputs.lock().unwrap().pop().unwrap();
        let mut received = Vec::new();
        output.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello world");
        assert_eq!(bridge.stats().bytes_written, 11);

        // Encoder exits on EOF
        launcher.exited.notify_one();
        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Idle);
        assert_eq!(launcher.kills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_data_dropped_unless_streaming() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, _events) = bridge_with(&launcher);

        bridge.data(Bytes::from_static(b"idle"));
        bridge.start();
        bridge.data(Bytes::from_static(b"starting"));

        assert_eq!(bridge.stats().chunks_dropped, 2);
        assert_eq!(bridge.stats().chunks_written, 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_returns_to_idle() {
        let launcher = Arc::new(FakeLauncher {
            fail: true,
            ..Default::default()
        });
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        pump(&mut bridge, &mut events).await;

        assert_eq!(bridge.state(), BridgeState::Idle);
        assert!(matches!(bridge.last_failure(), Some(BridgeError::Spawn(_))));
        assert_eq!(bridge.stats().spawn_failures, 1);

        // A fresh request is allowed
        bridge.start();
        assert_eq!(bridge.state(), BridgeState::Starting);
    }

    #[tokio::test]
    async fn test_start_timeout_kills_late_process() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        bridge.handle_event(BridgeEvent::StartTimedOut {
            generation: bridge.generation,
        });
        assert_eq!(bridge.state(), BridgeState::Idle);
        assert!(matches!(
            bridge.last_failure(),
            Some(BridgeError::StartTimeout(_))
        ));

        // The spawn completes after the timeout fired
        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Idle);
        assert_eq!(launcher.kills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_while_starting_cancels() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        bridge.stop();
        assert_eq!(bridge.state(), BridgeState::Stopping);

        // The launch lands and is killed at once
        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Stopping);
        assert_eq!(launcher.kills.load(Ordering::SeqCst), 1);

        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Idle);
        assert_eq!(bridge.stats().sessions_started, 0);
    }

    #[tokio::test]
    async fn test_start_stop_start_keeps_one_process() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        bridge.stop();
        bridge.start();
        assert_eq!(bridge.state(), BridgeState::Stopping);
        tokio::task::yield_now().await;
        assert!(launcher.spawns.load(Ordering::SeqCst) <= 1);

        // Started for the cancelled launch, then its exit
        pump(&mut bridge, &mut events).await;
        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Starting);

        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Streaming);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 2);
        assert_eq!(launcher.live.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.max_live.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_after_timeout_waits_for_late_process() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        bridge.handle_event(BridgeEvent::StartTimedOut {
            generation: bridge.generation,
        });
        bridge.start();
        assert_eq!(bridge.state(), BridgeState::Idle);

        // The late process is killed and reaped before the next spawn
        pump(&mut bridge, &mut events).await;
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 1);
        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Starting);

        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Streaming);
        assert_eq!(launcher.max_live.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_clears_deferred_start() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        bridge.stop();
        bridge.start();
        bridge.stop();

        pump(&mut bridge, &mut events).await;
        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Idle);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_input_drops_chunks() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        pump(&mut bridge, &mut events).await;

        // Nobody reads the encoder's stdin
        for _ in 0..64 {
            bridge.data(Bytes::from(vec![0u8; 1024]));
            tokio::task::yield_now().await;
        }

        let stats = bridge.stats();
        assert_eq!(bridge.state(), BridgeState::Streaming);
        assert!(stats.chunks_overflowed > 0);
        // Queue depth plus the one chunk the pump is stuck writing
        assert!(stats.chunks_written <= 5);
        assert_eq!(stats.chunks_written + stats.chunks_overflowed, 64);
    }

    #[tokio::test]
    async fn test_start_while_stopping_is_deferred() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        pump(&mut bridge, &mut events).await;
        bridge.stop();
        bridge.start();
        assert_eq!(bridge.state(), BridgeState::Stopping);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 1);

        launcher.exited.notify_one();
        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Starting);

        pump(&mut bridge, &mut events).await;
        assert_eq!(bridge.state(), BridgeState::Streaming);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_timeout_kills() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        pump(&mut bridge, &mut events).await;
        bridge.stop();

        bridge.handle_event(BridgeEvent::StopTimedOut {
            generation: bridge.generation,
        });
        pump(&mut bridge, &mut events).await;

        assert_eq!(bridge.state(), BridgeState::Idle);
        assert_eq!(launcher.kills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_failure_returns_to_idle() {
        let launcher = Arc::new(FakeLauncher::default());
        let (mut bridge, mut events) = bridge_with(&launcher);

        bridge.start();
        pump(&mut bridge, &mut events).await;

        // Encoder closes its input
        drop(launcher.outputs.lock().unwrap().pop());
        bridge.data(Bytes::from_static(b"lost"));
        pump(&mut bridge, &mut events).await;

        assert_eq!(bridge.state(), BridgeState::Idle);
        assert!(matches!(bridge.last_failure(), Some(BridgeError::Write(_))));
        assert_eq!(bridge.stats().write_failures, 1);
    }
}
