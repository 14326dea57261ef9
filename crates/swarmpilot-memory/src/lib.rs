//! In-memory orchestrator backend for the Swarmpilot server.
//!
//! This crate provides an in-memory implementation of the `Orchestrator`
//! trait from `swarmpilot-orchestrator`, backed by a concurrent map. It is
//! used by the test suites and by the `memory` backend mode, which lets the
//! server run without a cluster endpoint.
//!
//! # Example
//!
//! ```ignore
//! use swarmpilot_memory::MemoryOrchestrator;
//! use swarmpilot_orchestrator::{Orchestrator, ServiceSpec};
//!
//! let orchestrator = MemoryOrchestrator::new();
//! let created = orchestrator
//!     .create_service(&ServiceSpec::new("web", "nginx:alpine"))
//!     .await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use swarmpilot_orchestrator::{
    LiveService, Orchestrator, OrchestratorError, ServiceSpec, ServiceUpdate,
};

/// One service held by the in-memory cluster.
#[derive(Debug, Clone)]
struct StoredService {
    spec: ServiceSpec,
    status: String,
    /// Bumped on every forced update, standing in for a rollout epoch.
    generation: u64,
    logs: String,
}

impl StoredService {
    fn to_live(&self) -> LiveService {
        LiveService {
            name: self.spec.name.clone(),
            image: self.spec.image.clone(),
            status: self.status.clone(),
            ports: self.spec.ports.clone(),
            env: self.spec.env.clone(),
        }
    }
}

/// In-memory `Orchestrator` implementation.
#[derive(Debug, Default)]
pub struct MemoryOrchestrator {
    services: DashMap<String, StoredService>,
    update_calls: AtomicU64,
    remove_calls: AtomicU64,
}

impl MemoryOrchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a service as already running, bypassing create validation.
    pub fn insert_running(&self, spec: ServiceSpec) {
        self.services.insert(
            spec.name.clone(),
            StoredService {
                spec,
                status: "running".to_string(),
                generation: 0,
                logs: String::new(),
            },
        );
    }

    /// Overrides the reported rollout status of a service. No-op when absent.
    pub fn set_status(&self, name: &str, status: impl Into<String>) {
        if let Some(mut entry) = self.services.get_mut(name) {
            entry.status = status.into();
        }
    }

    /// Replaces the stored log text of a service. No-op when absent.
    pub fn set_logs(&self, name: &str, logs: impl Into<String>) {
        if let Some(mut entry) = self.services.get_mut(name) {
            entry.logs = logs.into();
        }
    }

    /// Rollout epoch of a service, for asserting that forced updates landed.
    #[must_use]
    pub fn generation(&self, name: &str) -> Option<u64> {
        self.services.get(name).map(|s| s.generation)
    }

    /// Total update commands issued against this backend.
    #[must_use]
    pub fn update_call_count(&self) -> u64 {
        self.update_calls.load(Ordering::Relaxed)
    }

    /// Total remove commands issued against this backend.
    #[must_use]
    pub fn remove_call_count(&self) -> u64 {
        self.remove_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Orchestrator for MemoryOrchestrator {
    async fn list_services(&self) -> Result<Vec<LiveService>, OrchestratorError> {
        let mut services: Vec<LiveService> =
            self.services.iter().map(|entry| entry.to_live()).collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn get_service(&self, name: &str) -> Result<LiveService, OrchestratorError> {
        self.services
            .get(name)
            .map(|entry| entry.to_live())
            .ok_or_else(|| OrchestratorError::not_found(name))
    }

    async fn create_service(&self, spec: &ServiceSpec) -> Result<LiveService, OrchestratorError> {
        if spec.image.is_empty() {
            return Err(OrchestratorError::rejected(format!(
                "service {} has no image reference",
                spec.name
            )));
        }
        if self.services.contains_key(&spec.name) {
            return Err(OrchestratorError::rejected(format!(
                "name conflicts with an existing service: {}",
                spec.name
            )));
        }
        let stored = StoredService {
            spec: spec.clone(),
            status: "running".to_string(),
            generation: 0,
            logs: String::new(),
        };
        let live = stored.to_live();
        self.services.insert(spec.name.clone(), stored);
        tracing::debug!(service = %spec.name, "created in-memory service");
        Ok(live)
    }

    async fn update_service(
        &self,
        name: &str,
        update: &ServiceUpdate,
    ) -> Result<(), OrchestratorError> {
        let mut entry = self
            .services
            .get_mut(name)
            .ok_or_else(|| OrchestratorError::not_found(name))?;
        self.update_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(image) = &update.image {
            entry.spec.image = image.clone();
        }
        if let Some(env) = &update.env {
            entry.spec.env = env.clone();
        }
        if let Some(ports) = &update.ports {
            entry.spec.ports = ports.clone();
        }
        if update.force {
            entry.generation += 1;
        }
        Ok(())
    }

    async fn remove_service(&self, name: &str) -> Result<(), OrchestratorError> {
        match self.services.remove(name) {
            Some(_) => {
                self.remove_calls.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(OrchestratorError::not_found(name)),
        }
    }

    async fn service_logs(&self, name: &str, tail: u32) -> Result<String, OrchestratorError> {
        let entry = self
            .services
            .get(name)
            .ok_or_else(|| OrchestratorError::not_found(name))?;
        let lines: Vec<&str> = entry.logs.lines().collect();
        let start = lines.len().saturating_sub(tail as usize);
        Ok(lines[start..].join("\n"))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmpilot_orchestrator::PortMapping;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let orchestrator = MemoryOrchestrator::new();
        let spec = ServiceSpec::new("web", "nginx:alpine")
            .with_ports(vec![PortMapping::new(8085, 80)])
            .with_env(vec!["MODE=edge".to_string()]);
        orchestrator.create_service(&spec).await.unwrap();

        let live = orchestrator.get_service("web").await.unwrap();
        assert_eq!(live.image, "nginx:alpine");
        assert_eq!(live.status, "running");
        assert_eq!(live.ports, vec![PortMapping::new(8085, 80)]);
    }

    #[tokio::test]
    async fn create_rejects_duplicates_and_missing_image() {
        let orchestrator = MemoryOrchestrator::new();
        orchestrator
            .create_service(&ServiceSpec::new("web", "nginx:alpine"))
            .await
            .unwrap();

        let err = orchestrator
            .create_service(&ServiceSpec::new("web", "nginx:alpine"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Rejected { .. }));

        let err = orchestrator
            .create_service(&ServiceSpec::new("empty", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Rejected { .. }));
    }

    #[tokio::test]
    async fn forced_update_bumps_generation() {
        let orchestrator = MemoryOrchestrator::new();
        orchestrator
            .create_service(&ServiceSpec::new("web", "nginx:alpine"))
            .await
            .unwrap();

        orchestrator
            .update_service("web", &ServiceUpdate::force_redeploy())
            .await
            .unwrap();
        assert_eq!(orchestrator.generation("web"), Some(1));

        let err = orchestrator
            .update_service("ghost", &ServiceUpdate::force_redeploy())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn logs_tail_returns_last_lines() {
        let orchestrator = MemoryOrchestrator::new();
        orchestrator
            .create_service(&ServiceSpec::new("web", "nginx:alpine"))
            .await
            .unwrap();
        orchestrator.set_logs("web", "one\ntwo\nthree\nfour");

        let tail = orchestrator.service_logs("web", 2).await.unwrap();
        assert_eq!(tail, "three\nfour");

        let all = orchestrator.service_logs("web", 100).await.unwrap();
        assert_eq!(all, "one\ntwo\nthree\nfour");
    }

    #[tokio::test]
    async fn remove_is_terminal() {
        let orchestrator = MemoryOrchestrator::new();
        orchestrator
            .create_service(&ServiceSpec::new("web", "nginx:alpine"))
            .await
            .unwrap();
        orchestrator.remove_service("web").await.unwrap();
        assert!(orchestrator.get_service("web").await.unwrap_err().is_not_found());
        assert!(orchestrator.remove_service("web").await.unwrap_err().is_not_found());
    }
}
