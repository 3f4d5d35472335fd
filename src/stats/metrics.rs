//! Statistics and metrics for the relay

use serde::Serialize;

use crate::bridge::BridgeState;

/// Counters kept by the media bridge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Subprocesses successfully spawned
    pub sessions_started: u64,
    /// Spawn attempts that failed or timed out
    pub spawn_failures: u64,
    /// Writes to subprocess input that failed
    pub write_failures: u64,
    /// Chunks queued for the subprocess
    pub chunks_written: u64,
    /// Bytes queued for the subprocess
    pub bytes_written: u64,
    /// Chunks dropped because the bridge was not streaming
    pub chunks_dropped: u64,
    /// Chunks dropped because the encoder input queue was full
    pub chunks_overflowed: u64,
}

impl BridgeStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_written(&mut self, len: usize) {
        self.chunks_written += 1;
        self.bytes_written += len as u64;
    }

    pub(crate) fn record_dropped(&mut self) {
        self.chunks_dropped += 1;
    }

    pub(crate) fn record_overflow(&mut self) {
        self.chunks_overflowed += 1;
    }
}

/// Snapshot returned by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Whether the broadcaster slot is occupied
    pub broadcaster_connected: bool,
    /// Connections holding the viewer role
    pub viewer_count: usize,
    /// Viewers plus the broadcaster
    pub total_connections: usize,
    /// Current bridge state
    pub bridge_state: BridgeState,
}
