//! Crate-level error types
//!
//! Signaling-path failures never surface here: dropped relays, role
//! violations and bridge failures are handled where they occur. This type
//! covers setup (bind, config), the HTTP ingest endpoint and the actor
//! channel going away.

/// Errors returned by the public API
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or process I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebRTC stack rejected an operation
    #[error("WebRTC error: {0}")]
    WebRtc(#[from] webrtc::Error),

    /// A configuration value was invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The coordinator task has shut down
    #[error("coordinator is not running")]
    CoordinatorClosed,
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Config("PORT must be a number".into()).to_string(),
            "invalid configuration: PORT must be a number"
        );
        assert_eq!(
            Error::CoordinatorClosed.to_string(),
            "coordinator is not running"
        );
    }
}
