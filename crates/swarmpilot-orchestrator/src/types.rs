//! Shared types for the orchestrator abstraction layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single published-port to target-port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port published on the cluster ingress.
    pub published: u16,
    /// Port the container listens on.
    pub target: u16,
}

impl PortMapping {
    #[must_use]
    pub fn new(published: u16, target: u16) -> Self {
        Self { published, target }
    }
}

/// Desired specification for a service to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique service name within the cluster.
    pub name: String,
    /// Container image reference.
    pub image: String,
    /// Published port mappings.
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    /// Environment variable assignments as `KEY=VALUE` lines.
    #[serde(default)]
    pub env: Vec<String>,
}

impl ServiceSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_ports(mut self, ports: Vec<PortMapping>) -> Self {
        self.ports = ports;
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: Vec<String>) -> Self {
        self.env = env;
        self
    }
}

/// Observed state of a service running in the cluster.
///
/// Owned and mutated exclusively by the orchestrator; this system only reads
/// it and issues commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveService {
    /// Service name.
    pub name: String,
    /// Container image reference from the running spec.
    pub image: String,
    /// Current rollout status as reported by the orchestrator.
    pub status: String,
    /// Currently published port mappings.
    pub ports: Vec<PortMapping>,
    /// Environment assignments from the running spec, as `KEY=VALUE` lines.
    pub env: Vec<String>,
}

/// A partial update to apply to an existing service.
///
/// `None` fields leave the running spec untouched. `ports` is a full
/// replacement of the port set when present, never a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceUpdate {
    /// Replacement image reference.
    pub image: Option<String>,
    /// Replacement environment line set.
    pub env: Option<Vec<String>>,
    /// Replacement port mapping set.
    pub ports: Option<Vec<PortMapping>>,
    /// Force a rolling restart even if the spec is unchanged.
    pub force: bool,
}

impl ServiceUpdate {
    /// An update that only forces a rolling restart of the current spec.
    #[must_use]
    pub fn force_redeploy() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}

/// Splits `KEY=VALUE` environment lines into a map.
///
/// Lines without an `=` separator are skipped, matching how orchestrators
/// store free-form env lists.
#[must_use]
pub fn env_lines_to_map(lines: &[String]) -> BTreeMap<String, String> {
    lines
        .iter()
        .filter_map(|line| {
            line.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}

/// Joins an environment map back into `KEY=VALUE` lines.
#[must_use]
pub fn map_to_env_lines(map: &BTreeMap<String, String>) -> Vec<String> {
    map.iter().map(|(k, v)| format!("{k}={v}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_lines_round_trip() {
        let lines = vec!["A=1".to_string(), "B=two=three".to_string()];
        let map = env_lines_to_map(&lines);
        assert_eq!(map.get("A").map(String::as_str), Some("1"));
        // Only the first '=' splits key from value
        assert_eq!(map.get("B").map(String::as_str), Some("two=three"));
        assert_eq!(map_to_env_lines(&map), lines);
    }

    #[test]
    fn env_lines_skip_malformed_entries() {
        let lines = vec!["VALID=yes".to_string(), "NOSEPARATOR".to_string()];
        let map = env_lines_to_map(&lines);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("VALID"));
    }

    #[test]
    fn force_redeploy_changes_nothing_else() {
        let update = ServiceUpdate::force_redeploy();
        assert!(update.force);
        assert!(update.image.is_none());
        assert!(update.env.is_none());
        assert!(update.ports.is_none());
    }
}
