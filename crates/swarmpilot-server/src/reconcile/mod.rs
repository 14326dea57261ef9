//! Stack reconciliation: converge live cluster state toward the declared
//! stack file by creating whatever is missing.
//!
//! Convergence is strictly additive. A live service absent from the file is
//! never removed or updated, and a declared name that already exists live is
//! never touched, so a sync is safe to repeat at any time.

mod stack;

pub use stack::{StackEntry, StackError, StackFile};

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use swarmpilot_api::{ApiError, SyncOutcome};
use swarmpilot_orchestrator::{DynOrchestrator, OrchestratorError, ServiceSpec};

/// Errors that fail the whole sync call.
///
/// Per-service creation failures are deliberately *not* here - they are
/// captured as `SyncOutcome::Error` entries instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error("failed to list live services: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            // A broken stack file is the one fatal 500 case
            SyncError::Stack(e) => ApiError::internal(e.to_string()),
            SyncError::Orchestrator(e) => ApiError::bad_request(e.to_string()),
        }
    }
}

/// Reconciles the declarative stack file against live cluster state.
///
/// Constructed once at startup with an injected orchestrator handle; the
/// stack file itself is re-read on every [`sync`](Self::sync) call.
pub struct StackReconciler {
    orchestrator: DynOrchestrator,
    stack_file: PathBuf,
}

impl StackReconciler {
    #[must_use]
    pub fn new(orchestrator: DynOrchestrator, stack_file: PathBuf) -> Self {
        Self {
            orchestrator,
            stack_file,
        }
    }

    #[must_use]
    pub fn stack_file(&self) -> &Path {
        &self.stack_file
    }

    /// Runs one reconciliation pass.
    ///
    /// Returns an outcome for exactly the declared names. Creation attempts
    /// are independent per name: one failure does not stop the rest.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when the stack file cannot be loaded or the
    /// live service list cannot be fetched.
    pub async fn sync(&self) -> Result<BTreeMap<String, SyncOutcome>, SyncError> {
        let declared = stack::load(&self.stack_file)?;
        let live: HashSet<String> = self
            .orchestrator
            .list_services()
            .await?
            .into_iter()
            .map(|s| s.name)
            .collect();

        let mut outcomes = BTreeMap::new();
        for (name, entry) in &declared.services {
            if live.contains(name) {
                outcomes.insert(name.clone(), SyncOutcome::AlreadyRunning);
                continue;
            }

            let spec = ServiceSpec {
                name: name.clone(),
                image: entry.image.clone().unwrap_or_default(),
                ports: entry.port_mappings(name),
                env: entry.environment.clone(),
            };
            let outcome = match self.orchestrator.create_service(&spec).await {
                Ok(_) => {
                    tracing::info!(service = %name, image = %spec.image, "deployed missing service");
                    SyncOutcome::Deployed
                }
                Err(err) => {
                    tracing::warn!(service = %name, error = %err, "service creation failed");
                    SyncOutcome::Error(err.to_string())
                }
            };
            outcomes.insert(name.clone(), outcome);
        }

        Ok(outcomes)
    }
}
