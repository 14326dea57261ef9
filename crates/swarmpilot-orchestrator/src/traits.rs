//! The orchestrator capability trait.
//!
//! This module defines the core trait that all orchestrator backends must
//! implement.

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::types::{LiveService, ServiceSpec, ServiceUpdate};

/// The capability interface over the external cluster orchestrator.
///
/// All authoritative state lives on the other side of this trait; the server
/// holds no caches. Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use swarmpilot_orchestrator::{Orchestrator, OrchestratorError};
///
/// async fn live_names(orchestrator: &dyn Orchestrator) -> Result<Vec<String>, OrchestratorError> {
///     let services = orchestrator.list_services().await?;
///     Ok(services.into_iter().map(|s| s.name).collect())
/// }
/// ```
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Lists all services currently known to the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, never for an empty
    /// cluster.
    async fn list_services(&self) -> Result<Vec<LiveService>, OrchestratorError>;

    /// Looks up a single service by name.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::NotFound` if no service with that name
    /// exists.
    async fn get_service(&self, name: &str) -> Result<LiveService, OrchestratorError>;

    /// Creates a new service from the given spec.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Rejected` if the cluster refuses the spec,
    /// for example on a name conflict or an invalid image reference.
    async fn create_service(&self, spec: &ServiceSpec) -> Result<LiveService, OrchestratorError>;

    /// Applies a partial update to an existing service.
    ///
    /// `update.force` triggers a rolling restart even when the spec is
    /// otherwise unchanged.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::NotFound` if the service does not exist.
    async fn update_service(
        &self,
        name: &str,
        update: &ServiceUpdate,
    ) -> Result<(), OrchestratorError>;

    /// Removes a service by name.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::NotFound` if the service does not exist.
    async fn remove_service(&self, name: &str) -> Result<(), OrchestratorError>;

    /// Fetches the last `tail` lines of combined stdout/stderr output.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::NotFound` if the service does not exist.
    async fn service_logs(&self, name: &str, tail: u32) -> Result<String, OrchestratorError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
