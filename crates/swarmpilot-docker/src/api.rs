//! Wire types for the Docker Engine Swarm service API.
//!
//! Only the subset of the `/services` object graph that the server reads or
//! writes is modeled here; unknown fields are ignored on deserialization and
//! never round-tripped.

use serde::{Deserialize, Serialize};

use swarmpilot_orchestrator::{LiveService, PortMapping, ServiceSpec};

/// A service object as returned by `GET /services` and `GET /services/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmService {
    #[serde(rename = "ID")]
    pub id: String,
    pub version: ObjectVersion,
    pub spec: SwarmServiceSpec,
    #[serde(default)]
    pub endpoint: Option<Endpoint>,
    #[serde(default)]
    pub update_status: Option<UpdateStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectVersion {
    pub index: u64,
}

/// The mutable service spec, posted back verbatim on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmServiceSpec {
    pub name: String,
    pub task_template: TaskTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_spec: Option<EndpointSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskTemplate {
    pub container_spec: ContainerSpec,
    /// Counter the engine compares against the previous value; bumping it
    /// forces a rolling restart without a spec change.
    #[serde(default)]
    pub force_update: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSpec {
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSpec {
    #[serde(default)]
    pub ports: Vec<PortConfig>,
}

/// Runtime endpoint state; `Ports` holds the currently published mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    #[serde(default)]
    pub ports: Vec<PortConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub published_port: u16,
    #[serde(default)]
    pub target_port: u16,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateStatus {
    #[serde(default)]
    pub state: Option<String>,
}

/// Response body of `POST /services/create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResponse {
    #[serde(rename = "ID")]
    pub id: String,
}

/// Error body the engine returns on failures.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineError {
    #[serde(default)]
    pub message: String,
}

impl SwarmService {
    /// Projects the engine object onto the orchestrator-neutral view.
    #[must_use]
    pub fn to_live(&self) -> LiveService {
        let status = self
            .update_status
            .as_ref()
            .and_then(|u| u.state.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let ports = self
            .endpoint
            .as_ref()
            .map(|e| {
                e.ports
                    .iter()
                    .map(|p| PortMapping::new(p.published_port, p.target_port))
                    .collect()
            })
            .unwrap_or_default();
        LiveService {
            name: self.spec.name.clone(),
            image: self.spec.task_template.container_spec.image.clone(),
            status,
            ports,
            env: self.spec.task_template.container_spec.env.clone(),
        }
    }
}

/// Builds the spec body for `POST /services/create` from a desired spec.
#[must_use]
pub fn create_spec(spec: &ServiceSpec) -> SwarmServiceSpec {
    SwarmServiceSpec {
        name: spec.name.clone(),
        task_template: TaskTemplate {
            container_spec: ContainerSpec {
                image: spec.image.clone(),
                env: spec.env.clone(),
            },
            force_update: 0,
        },
        endpoint_spec: Some(EndpointSpec {
            ports: spec
                .ports
                .iter()
                .map(|p| PortConfig {
                    protocol: "tcp".to_string(),
                    published_port: p.published,
                    target_port: p.target,
                })
                .collect(),
        }),
    }
}

/// Strips the 8-byte multiplexing headers from a service log stream.
///
/// Without a TTY the engine interleaves stdout/stderr as frames of
/// `[stream, 0, 0, 0, len_be_u32, payload]`. Streams from TTY services carry
/// no framing at all, so anything that does not parse cleanly falls back to
/// the raw bytes, lossily decoded.
#[must_use]
pub fn demux_log_stream(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while !rest.is_empty() {
        if rest.len() < 8 {
            return String::from_utf8_lossy(raw).into_owned();
        }
        let (header, tail) = rest.split_at(8);
        // stream id 0/1/2, three zero padding bytes
        if header[0] > 2 || header[1..4] != [0, 0, 0] {
            return String::from_utf8_lossy(raw).into_owned();
        }
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        if tail.len() < len {
            return String::from_utf8_lossy(raw).into_owned();
        }
        out.extend_from_slice(&tail[..len]);
        rest = &tail[len..];
    }
    String::from_utf8_lossy(&out).into_owned()
}
