//! Connection identity and status

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a random identifier
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero identifier
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Connection status as held by the configuration store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Syncs are scheduled
    #[default]
    Active,
    /// Syncs are paused (set by the policy on disable)
    Inactive,
    /// Connection was deleted by its owner
    Deprecated,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Deprecated => write!(f, "deprecated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_parse_and_display() {
        let raw = "8c5b1a9e-3a8e-4c5f-9e55-0b1f7d6c2a11";
        let id: ConnectionId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert!("not-a-uuid".parse::<ConnectionId>().is_err());
    }

    #[test]
    fn test_status_serde_names() {
        let yaml = serde_yaml::to_string(&ConnectionStatus::Inactive).unwrap();
        assert_eq!(yaml.trim(), "inactive");
        let parsed: ConnectionStatus = serde_yaml::from_str("active").unwrap();
        assert_eq!(parsed, ConnectionStatus::Active);
    }
}
