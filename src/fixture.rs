//! History fixtures for offline evaluation
//!
//! A fixture describes connections, their status and their job history. It is
//! loaded into the in-memory collaborators so the policy can be run from the
//! command line against a recorded or hand-written scenario.
//!
//! ```yaml
//! connections:
//!   - id: 8c5b1a9e-3a8e-4c5f-9e55-0b1f7d6c2a11
//!     status: active
//!     jobs:
//!       - { id: 2, status: failed, created_at: "2024-03-14T00:00:00Z" }
//!       - { id: 1, kind: sync, status: succeeded, created_at: "2024-03-13T00:00:00Z" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::connection::{ConnectionId, ConnectionStatus};
use crate::memory::{InMemoryConnectionStore, InMemoryJobHistory, JobRecord};

/// Root of a fixture file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Connections in the scenario
    #[serde(default)]
    pub connections: Vec<FixtureConnection>,
}

/// One connection and its jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConnection {
    /// Connection id
    pub id: ConnectionId,
    /// Current status
    #[serde(default)]
    pub status: ConnectionStatus,
    /// Jobs in any order
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
}

impl Fixture {
    /// Read a fixture from a `.json` or YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(serde_yaml::from_str(&raw)?)
        }
    }

    /// Populate fresh in-memory stores with the fixture's contents
    #[must_use]
    pub fn into_stores(self) -> (InMemoryJobHistory, InMemoryConnectionStore) {
        let history = InMemoryJobHistory::new();
        let connections = InMemoryConnectionStore::new();
        for connection in self.connections {
            connections.insert(connection.id, connection.status);
            for job in connection.jobs {
                history.record(connection.id, job);
            }
        }
        (history, connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobKind, JobStatus};

    const FIXTURE: &str = r#"
connections:
  - id: 8c5b1a9e-3a8e-4c5f-9e55-0b1f7d6c2a11
    jobs:
      - { id: 2, status: failed, created_at: "2024-03-14T00:00:00Z" }
      - { id: 1, kind: reset_connection, status: succeeded, created_at: "2024-03-13T00:00:00Z" }
  - id: 0d2f3c4b-5a69-4788-99aa-bbccddeeff00
    status: inactive
"#;

    #[test]
    fn test_parse_yaml_fixture() {
        let fixture: Fixture = serde_yaml::from_str(FIXTURE).unwrap();
        assert_eq!(fixture.connections.len(), 2);

        let first = &fixture.connections[0];
        assert_eq!(first.status, ConnectionStatus::Active);
        assert_eq!(first.jobs[0].kind, JobKind::Sync);
        assert_eq!(first.jobs[1].kind, JobKind::ResetConnection);
        assert_eq!(first.jobs[1].status, JobStatus::Succeeded);

        assert_eq!(fixture.connections[1].status, ConnectionStatus::Inactive);
        assert!(fixture.connections[1].jobs.is_empty());
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("history.yaml");
        std::fs::write(&yaml_path, FIXTURE).unwrap();
        let from_yaml = Fixture::load(&yaml_path).unwrap();

        let json_path = dir.path().join("history.json");
        std::fs::write(&json_path, serde_json::to_string(&from_yaml).unwrap()).unwrap();
        let from_json = Fixture::load(&json_path).unwrap();

        assert_eq!(from_json.connections.len(), 2);
        assert_eq!(from_json.connections[0].jobs, from_yaml.connections[0].jobs);
    }

    #[test]
    fn test_into_stores() {
        let fixture: Fixture = serde_yaml::from_str(FIXTURE).unwrap();
        let id = fixture.connections[1].id;
        let (_history, connections) = fixture.into_stores();
        assert_eq!(connections.status(id), Some(ConnectionStatus::Inactive));
    }
}
