//! Bridge error types
//!
//! Bridge failures are recorded and logged, never propagated to clients: a
//! broken bridge costs the RTMP output, not the broadcaster's session.

use std::io;
use std::time::Duration;

/// Error type for bridge failures
#[derive(Debug)]
pub enum BridgeError {
    /// The subprocess could not be spawned
    Spawn(io::Error),
    /// The subprocess did not report readiness in time
    StartTimeout(Duration),
    /// Writing to the subprocess input failed
    Write(io::Error),
    /// The subprocess exited while streaming
    Exited(Option<i32>),
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::Spawn(e) => write!(f, "Failed to spawn encoder: {}", e),
            BridgeError::StartTimeout(timeout) => {
                write!(f, "Encoder did not start within {:?}", timeout)
            }
            BridgeError::Write(e) => write!(f, "Failed to write to encoder: {}", e),
            BridgeError::Exited(Some(code)) => write!(f, "Encoder exited with status {}", code),
            BridgeError::Exited(None) => write!(f, "Encoder terminated by signal"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Spawn(e) | BridgeError::Write(e) => Some(e),
            _ => None,
        }
    }
}
