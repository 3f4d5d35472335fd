//! Relay target addressing

use std::fmt;

use serde::Deserialize;

use crate::registry::ConnectionId;

/// Reserved target value meaning "whoever is the broadcaster right now"
pub const BROADCAST_SENTINEL: &str = "broadcast";

/// Destination of a relayed message, as named by the sender
///
/// Ids go out as strings, but a client echoing one back as a JSON number
/// is understood too. Any other JSON value is accepted and never resolves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawTarget")]
pub enum Target {
    /// The current broadcaster, resolved at relay time
    Broadcaster,
    /// A specific connection
    Connection(ConnectionId),
    /// A value that can never name a connection
    Unresolvable(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Text(String),
    Number(u64),
    Other(serde_json::Value),
}

impl From<RawTarget> for Target {
    fn from(raw: RawTarget) -> Self {
        match raw {
            RawTarget::Text(text) => Target::from(text),
            RawTarget::Number(n) => Target::Connection(ConnectionId::new(n)),
            RawTarget::Other(value) => Target::Unresolvable(value.to_string()),
        }
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        if value == BROADCAST_SENTINEL {
            return Target::Broadcaster;
        }
        match value.parse() {
            Ok(id) => Target::Connection(id),
            Err(_) => Target::Unresolvable(value.to_owned()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Broadcaster => f.write_str(BROADCAST_SENTINEL),
            Target::Connection(id) => write!(f, "{}", id),
            Target::Unresolvable(raw) => f.write_str(raw),
        }
    }
}
