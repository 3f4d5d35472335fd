//! Connection identity and role types

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Unique identifier for a signaling connection
///
/// Ids are allocated from a monotonically increasing counter, so ordering
/// by id is the same as ordering by registration time. On the wire an id is
/// a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create an id from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl Serialize for ConnectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Role assigned to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Connected, has not joined yet
    #[default]
    Unassigned,
    /// Holds the broadcaster slot
    Broadcaster,
    /// Subscribed to the broadcaster's media
    Viewer,
}

impl Role {
    /// Name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unassigned => "unassigned",
            Role::Broadcaster => "broadcaster",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip_through_string() {
        let id = ConnectionId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<ConnectionId>().unwrap(), id);
        assert!("ghost".parse::<ConnectionId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_string() {
        let json = serde_json::to_string(&ConnectionId::new(7)).unwrap();
        assert_eq!(json, "\"7\"");
    }

    #[test]
    fn test_default_role() {
        assert_eq!(Role::default(), Role::Unassigned);
        assert_eq!(Role::Viewer.to_string(), "viewer");
    }
}
