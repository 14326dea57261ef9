//! HTTP API error taxonomy and wire types for the Swarmpilot server.
//!
//! This crate defines the JSON request/response shapes of the `/v1` surface
//! and the mapping from internal errors to HTTP status codes. Handlers in
//! `swarmpilot-server` return these types directly.

use std::collections::BTreeMap;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use swarmpilot_orchestrator::{OrchestratorError, PortMapping};

// -------------------------
// Errors
// -------------------------

/// High-level API errors mapped to HTTP responses.
///
/// The taxonomy is deliberately small: named-resource misses become 404,
/// every other orchestrator failure surfaces as 400 with the underlying
/// message, and stack-file load failures are the single fatal 500 case.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::NotFound { .. } => ApiError::NotFound("Service not found".into()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// JSON body for error responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
            ApiError::NotFound(msg) => msg,
        };
        let body = ErrorBody {
            code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Type alias for a handler result.
pub type ApiResult<T> = Result<T, ApiError>;

// -------------------------
// Port wire shape
// -------------------------

/// Ports on the wire are an object keyed by published port, e.g.
/// `{"8085": 80}`. Keys are strings because JSON object keys always are.
pub type PortMap = BTreeMap<String, u16>;

/// Converts internal port mappings to the wire shape.
#[must_use]
pub fn ports_to_wire(ports: &[PortMapping]) -> PortMap {
    ports
        .iter()
        .map(|p| (p.published.to_string(), p.target))
        .collect()
}

/// Parses the wire shape back into port mappings.
///
/// # Errors
///
/// Returns `ApiError::BadRequest` when a key is not a valid port number.
pub fn ports_from_wire(wire: &PortMap) -> ApiResult<Vec<PortMapping>> {
    wire.iter()
        .map(|(published, target)| {
            let published = published
                .parse::<u16>()
                .map_err(|_| ApiError::bad_request(format!("invalid published port: {published}")))?;
            Ok(PortMapping::new(published, *target))
        })
        .collect()
}

// -------------------------
// Request / response types
// -------------------------

/// Request body for `POST /v1/services`.
///
/// The service name is not part of the request: it is derived from the image
/// reference. `secrets` is passed through to the orchestrator as environment
/// assignments, preserving the historical wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub image: String,
    #[serde(default)]
    pub ports: Option<PortMap>,
    #[serde(default)]
    pub secrets: Option<Vec<String>>,
    #[serde(default)]
    pub configs: Option<Vec<BTreeMap<String, String>>>,
}

/// Projection of a live service returned by list/get/register.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceDetail {
    pub name: String,
    pub status: String,
    pub ports: PortMap,
}

/// Response body for `GET /v1/services`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListResponse {
    pub services: Vec<ServiceDetail>,
    /// Pre-pagination size of the full set.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Request body for `POST /v1/deploy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub services: Vec<String>,
}

/// Per-service outcome of a deploy or rollback request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployResponse {
    pub status: String,
    pub message: String,
}

impl DeployResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "failed".into(),
            message: message.into(),
        }
    }
}

/// Response body for `POST /v1/deploy`: one outcome per requested name.
pub type BatchDeployResponse = BTreeMap<String, DeployResponse>;

/// Current environment and ports of a running service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigDetail {
    pub env: BTreeMap<String, String>,
    pub ports: PortMap,
}

/// Request body for `PATCH /v1/services/{name}/config`.
///
/// `env` is a merge patch: present keys overwrite, absent keys are retained.
/// `ports`, when present, fully replaces the port mapping set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub ports: Option<PortMap>,
}

/// Response body for `GET /v1/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Whole seconds since the server started.
    pub uptime: u64,
}

// -------------------------
// Stack sync
// -------------------------

/// Per-service result of one reconciliation pass.
///
/// Serialized as the strings `"deployed"`, `"already running"` or
/// `"error: <message>"`; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Deployed,
    AlreadyRunning,
    Error(String),
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Deployed => write!(f, "deployed"),
            SyncOutcome::AlreadyRunning => write!(f, "already running"),
            SyncOutcome::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl Serialize for SyncOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SyncOutcome {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "deployed" => Ok(SyncOutcome::Deployed),
            "already running" => Ok(SyncOutcome::AlreadyRunning),
            other => match other.strip_prefix("error: ") {
                Some(msg) => Ok(SyncOutcome::Error(msg.to_string())),
                None => Err(D::Error::custom(format!("unknown sync outcome: {other}"))),
            },
        }
    }
}

/// Response body for `POST /v1/stack/sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSyncResponse {
    /// Outcome keyed by every declared service name.
    pub status: BTreeMap<String, SyncOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn orchestrator_not_found_maps_to_404() {
        let err: ApiError = OrchestratorError::not_found("web").into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: ApiError = OrchestratorError::rejected("bad image").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("bad image"));
    }

    #[test]
    fn sync_outcome_wire_strings() {
        assert_eq!(
            serde_json::to_string(&SyncOutcome::Deployed).unwrap(),
            "\"deployed\""
        );
        assert_eq!(
            serde_json::to_string(&SyncOutcome::AlreadyRunning).unwrap(),
            "\"already running\""
        );
        assert_eq!(
            serde_json::to_string(&SyncOutcome::Error("boom".into())).unwrap(),
            "\"error: boom\""
        );

        let parsed: SyncOutcome = serde_json::from_str("\"error: boom\"").unwrap();
        assert_eq!(parsed, SyncOutcome::Error("boom".into()));
        let parsed: SyncOutcome = serde_json::from_str("\"already running\"").unwrap();
        assert_eq!(parsed, SyncOutcome::AlreadyRunning);
    }

    #[test]
    fn port_wire_round_trip() {
        let ports = vec![PortMapping::new(8085, 80), PortMapping::new(9090, 9090)];
        let wire = ports_to_wire(&ports);
        assert_eq!(wire.get("8085"), Some(&80));
        let back = ports_from_wire(&wire).unwrap();
        assert_eq!(back, ports);
    }

    #[test]
    fn invalid_wire_port_is_rejected() {
        let mut wire = PortMap::new();
        wire.insert("not-a-port".into(), 80);
        let err = ports_from_wire(&wire).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
