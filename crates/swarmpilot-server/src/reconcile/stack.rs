//! Declarative stack file parsing.
//!
//! The stack file is a YAML document with a top-level `services` mapping.
//! Each entry optionally carries an `image`, a list of
//! `{published, target}` port pairs and an `environment` list of `KEY=VALUE`
//! strings. Declaration order is preserved.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

use swarmpilot_orchestrator::PortMapping;

/// The full declared set of services.
#[derive(Debug, Default, Deserialize)]
pub struct StackFile {
    #[serde(default)]
    pub services: IndexMap<String, StackEntry>,
}

/// One declared service.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StackEntry {
    pub image: Option<String>,
    /// Raw port entries; coercion to integers happens per entry so a bad
    /// entry can be dropped without failing the whole file.
    pub ports: Vec<Value>,
    pub environment: Vec<String>,
}

impl StackEntry {
    /// Coerces the declared port entries into mappings.
    ///
    /// Each entry's coercion is an explicit success or failure: a failing
    /// entry drops only that one mapping and is logged, it does not abort
    /// the service's creation.
    #[must_use]
    pub fn port_mappings(&self, service: &str) -> Vec<PortMapping> {
        self.ports
            .iter()
            .filter_map(|entry| match coerce_port_entry(entry) {
                Some(mapping) => Some(mapping),
                None => {
                    tracing::warn!(
                        service = %service,
                        entry = ?entry,
                        "skipping port entry with non-integer published/target fields"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Errors raised while loading the stack file.
///
/// These are fatal to the whole sync call, unlike per-service creation
/// failures which are reported as outcomes.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("failed to read stack file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse stack file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Reads and parses the stack file. Re-read on every call, never cached.
pub fn load(path: &Path) -> Result<StackFile, StackError> {
    let content = std::fs::read_to_string(path).map_err(|source| StackError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| StackError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn coerce_port_entry(value: &Value) -> Option<PortMapping> {
    let map = value.as_mapping()?;
    let published = coerce_port(lookup(map, "published")?)?;
    let target = coerce_port(lookup(map, "target")?)?;
    Some(PortMapping::new(published, target))
}

fn lookup<'a>(map: &'a serde_yaml::Mapping, key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn coerce_port(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> StackFile {
        serde_yaml::from_str(content).unwrap()
    }

    #[test]
    fn parses_services_in_declared_order() {
        let stack = parse(
            r#"
services:
  web:
    image: nginx:alpine
    ports:
      - published: 8085
        target: 80
    environment:
      - MODE=edge
  worker:
    image: busybox:stable
"#,
        );
        let names: Vec<&String> = stack.services.keys().collect();
        assert_eq!(names, ["web", "worker"]);

        let web = &stack.services["web"];
        assert_eq!(web.image.as_deref(), Some("nginx:alpine"));
        assert_eq!(web.port_mappings("web"), vec![PortMapping::new(8085, 80)]);
        assert_eq!(web.environment, vec!["MODE=edge".to_string()]);

        let worker = &stack.services["worker"];
        assert!(worker.ports.is_empty());
        assert!(worker.environment.is_empty());
    }

    #[test]
    fn coerces_string_ports() {
        let stack = parse(
            r#"
services:
  web:
    image: nginx:alpine
    ports:
      - published: "8085"
        target: "80"
"#,
        );
        let web = &stack.services["web"];
        assert_eq!(web.port_mappings("web"), vec![PortMapping::new(8085, 80)]);
    }

    #[test]
    fn drops_only_the_bad_port_entry() {
        let stack = parse(
            r#"
services:
  web:
    image: nginx:alpine
    ports:
      - published: not-a-port
        target: 80
      - published: 9090
        target: 9090
      - published: 70000
        target: 80
"#,
        );
        let web = &stack.services["web"];
        // First entry fails string coercion, third overflows u16
        assert_eq!(web.port_mappings("web"), vec![PortMapping::new(9090, 9090)]);
    }

    #[test]
    fn missing_services_key_parses_as_empty() {
        let stack = parse("version: \"3\"\n");
        assert!(stack.services.is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.yml");
        std::fs::write(&path, "services: [not: {a mapping").unwrap();
        assert!(matches!(load(&path), Err(StackError::Parse { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(Path::new("/nonexistent/stack.yml")).unwrap_err();
        assert!(matches!(err, StackError::Io { .. }));
    }
}
