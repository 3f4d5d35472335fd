//! Tasks attached to a running encoder
//!
//! Each spawned process gets two tasks: an input pump that owns the stdin
//! stream and a monitor that owns the process handle. Both report back to
//! the bridge through [`BridgeEvent`]s tagged with the spawn generation.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use super::process::ChildProcess;
use super::state::BridgeEvent;

/// Write chunks to the encoder input in arrival order
///
/// Returns when the chunk channel closes (graceful stop: stdin is shut down
/// so the encoder sees EOF) or when a write fails (reported as
/// [`BridgeEvent::WriteFailed`]).
pub(crate) async fn pump_input<W>(
    generation: u64,
    mut input: W,
    mut chunks: mpsc::Receiver<Bytes>,
    events: mpsc::UnboundedSender<BridgeEvent>,
) where
    W: AsyncWrite + Send + Unpin,
{
    while let Some(chunk) = chunks.recv().await {
        if let Err(error) = input.write_all(&chunk).await {
            let _ = events.send(BridgeEvent::WriteFailed { generation, error });
            return;
        }
    }

    if let Err(e) = input.shutdown().await {
        tracing::debug!(generation = generation, error = %e, "Encoder input shutdown failed");
    }
}

/// Wait for the encoder to exit, killing it when asked
///
/// Dropping the kill sender also kills the process.
pub(crate) async fn monitor_exit(
    generation: u64,
    mut process: Box<dyn ChildProcess>,
    kill: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<BridgeEvent>,
) {
    let status = tokio::select! {
        status = process.wait_exit() => status,
        _ = kill => {
            if let Err(e) = process.terminate() {
                tracing::warn!(generation = generation, error = %e, "Failed to kill encoder");
            }
            process.wait_exit().await
        }
    };

    let _ = events.send(BridgeEvent::Exited { generation, status });
}
