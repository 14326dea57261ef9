//! Docker Engine (Swarm) orchestrator backend for the Swarmpilot server.
//!
//! This crate implements the `Orchestrator` trait from
//! `swarmpilot-orchestrator` against the Docker Engine REST API. It targets
//! the Swarm service endpoints (`/services`, `/services/create`,
//! `/services/{id}/update`) and assumes the engine is part of a swarm.
//!
//! The engine endpoint is plain HTTP (e.g. `http://localhost:2375`); socket
//! activation and TLS negotiation are left to the deployment environment.

pub mod api;

use async_trait::async_trait;
use reqwest::StatusCode;

use swarmpilot_orchestrator::{
    LiveService, Orchestrator, OrchestratorError, ServiceSpec, ServiceUpdate,
};

use crate::api::{CreateResponse, EngineError, SwarmService, create_spec, demux_log_stream};

/// `Orchestrator` implementation over the Docker Engine REST API.
#[derive(Debug, Clone)]
pub struct DockerOrchestrator {
    http: reqwest::Client,
    base_url: String,
}

impl DockerOrchestrator {
    /// Creates a client for the given engine endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let base_url = endpoint.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetches the full engine-side service object, version index included.
    async fn fetch_service(&self, name: &str) -> Result<SwarmService, OrchestratorError> {
        let response = self
            .http
            .get(self.url(&format!("/services/{name}")))
            .send()
            .await
            .map_err(|e| OrchestratorError::connection(e.to_string()))?;
        let response = check_status(response, Some(name)).await?;
        response
            .json::<SwarmService>()
            .await
            .map_err(|e| OrchestratorError::internal(format!("malformed engine response: {e}")))
    }
}

/// Maps non-success engine statuses onto the error taxonomy.
///
/// 404 becomes `NotFound` when the request named a service; everything else
/// surfaces the engine's `message` field as a rejection.
async fn check_status(
    response: reqwest::Response,
    name: Option<&str>,
) -> Result<reqwest::Response, OrchestratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<EngineError>()
        .await
        .map(|e| e.message)
        .unwrap_or_else(|_| format!("engine returned status {status}"));
    if status == StatusCode::NOT_FOUND {
        if let Some(name) = name {
            return Err(OrchestratorError::not_found(name));
        }
    }
    Err(OrchestratorError::rejected(message))
}

#[async_trait]
impl Orchestrator for DockerOrchestrator {
    async fn list_services(&self) -> Result<Vec<LiveService>, OrchestratorError> {
        let response = self
            .http
            .get(self.url("/services"))
            .send()
            .await
            .map_err(|e| OrchestratorError::connection(e.to_string()))?;
        let response = check_status(response, None).await?;
        let services: Vec<SwarmService> = response
            .json()
            .await
            .map_err(|e| OrchestratorError::internal(format!("malformed engine response: {e}")))?;
        Ok(services.iter().map(SwarmService::to_live).collect())
    }

    async fn get_service(&self, name: &str) -> Result<LiveService, OrchestratorError> {
        Ok(self.fetch_service(name).await?.to_live())
    }

    async fn create_service(&self, spec: &ServiceSpec) -> Result<LiveService, OrchestratorError> {
        let body = create_spec(spec);
        let response = self
            .http
            .post(self.url("/services/create"))
            .json(&body)
            .send()
            .await
            .map_err(|e| OrchestratorError::connection(e.to_string()))?;
        // A 404 here means a missing image, not a missing service
        let response = check_status(response, None).await?;
        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| OrchestratorError::internal(format!("malformed engine response: {e}")))?;
        tracing::info!(service = %spec.name, id = %created.id, "service created");
        self.get_service(&spec.name).await
    }

    async fn update_service(
        &self,
        name: &str,
        update: &ServiceUpdate,
    ) -> Result<(), OrchestratorError> {
        let current = self.fetch_service(name).await?;
        let mut spec = current.spec.clone();
        if let Some(image) = &update.image {
            spec.task_template.container_spec.image = image.clone();
        }
        if let Some(env) = &update.env {
            spec.task_template.container_spec.env = env.clone();
        }
        if let Some(ports) = &update.ports {
            spec.endpoint_spec = Some(api::EndpointSpec {
                ports: ports
                    .iter()
                    .map(|p| api::PortConfig {
                        protocol: "tcp".to_string(),
                        published_port: p.published,
                        target_port: p.target,
                    })
                    .collect(),
            });
        }
        if update.force {
            spec.task_template.force_update += 1;
        }

        let response = self
            .http
            .post(self.url(&format!(
                "/services/{}/update?version={}",
                current.id, current.version.index
            )))
            .json(&spec)
            .send()
            .await
            .map_err(|e| OrchestratorError::connection(e.to_string()))?;
        check_status(response, Some(name)).await?;
        tracing::info!(service = %name, force = update.force, "service updated");
        Ok(())
    }

    async fn remove_service(&self, name: &str) -> Result<(), OrchestratorError> {
        let response = self
            .http
            .delete(self.url(&format!("/services/{name}")))
            .send()
            .await
            .map_err(|e| OrchestratorError::connection(e.to_string()))?;
        check_status(response, Some(name)).await?;
        tracing::info!(service = %name, "service removed");
        Ok(())
    }

    async fn service_logs(&self, name: &str, tail: u32) -> Result<String, OrchestratorError> {
        let tail = tail.to_string();
        let response = self
            .http
            .get(self.url(&format!("/services/{name}/logs")))
            .query(&[
                ("stdout", "true"),
                ("stderr", "true"),
                ("tail", tail.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OrchestratorError::connection(e.to_string()))?;
        let response = check_status(response, Some(name)).await?;
        let raw = response
            .bytes()
            .await
            .map_err(|e| OrchestratorError::connection(e.to_string()))?;
        Ok(demux_log_stream(&raw))
    }

    fn backend_name(&self) -> &'static str {
        "docker"
    }
}
