//! Subprocess seams
//!
//! The bridge never touches `tokio::process` directly. It asks a
//! [`Launcher`] for a [`Spawned`] process (an input stream plus a
//! [`ChildProcess`] to wait on or kill), which keeps the state machine
//! testable without ffmpeg installed.

use std::io;
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::process::{Child, Command};

use super::config::BridgeConfig;

/// A running subprocess the bridge can wait on and terminate
pub trait ChildProcess: Send + 'static {
    /// Wait for the process to exit, yielding its exit code if it has one
    fn wait_exit(&mut self) -> BoxFuture<'_, io::Result<Option<i32>>>;

    /// Begin forceful termination without waiting for exit
    fn terminate(&mut self) -> io::Result<()>;
}

impl ChildProcess for Child {
    fn wait_exit(&mut self) -> BoxFuture<'_, io::Result<Option<i32>>> {
        Box::pin(async move {
            let status = self.wait().await?;
            Ok(status.code())
        })
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.start_kill()
    }
}

/// A freshly spawned subprocess
pub struct Spawned {
    /// The process's input stream
    pub input: Box<dyn AsyncWrite + Send + Unpin>,

    /// Handle used to wait on or kill the process
    pub process: Box<dyn ChildProcess>,
}

impl Spawned {
    /// Bundle an input stream and a process handle
    pub fn new(
        input: impl AsyncWrite + Send + Unpin + 'static,
        process: impl ChildProcess,
    ) -> Self {
        Self {
            input: Box::new(input),
            process: Box::new(process),
        }
    }
}

impl std::fmt::Debug for Spawned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawned").finish_non_exhaustive()
    }
}

/// Starts encoder subprocesses
///
/// Called from a spawned task, never from the coordinator loop itself.
pub trait Launcher: Send + Sync + 'static {
    /// Spawn a new encoder process
    fn launch(&self) -> io::Result<Spawned>;
}

/// Launches ffmpeg with the configured arguments
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    config: BridgeConfig,
}

impl FfmpegLauncher {
    /// Create a launcher for `config`
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// The launcher's configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl Launcher for FfmpegLauncher {
    fn launch(&self) -> io::Result<Spawned> {
        let mut child = Command::new(&self.config.program)
            .args(self.config.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "ffmpeg stdin not captured"))?;

        if let Some(stderr) = child.stderr.take() {
            let pid = child.id();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "broadcast_relay::ffmpeg", pid = ?pid, "{}", line);
                }
            });
        }

        tracing::info!(
            program = %self.config.program.display(),
            output = %self.config.output_url,
            pid = ?child.id(),
            "Encoder spawned"
        );

        Ok(Spawned::new(stdin, child))
    }
}
