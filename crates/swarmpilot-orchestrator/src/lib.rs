//! # swarmpilot-orchestrator
//!
//! Orchestrator abstraction layer for the Swarmpilot server.
//!
//! This crate defines the traits and types that all orchestrator backends must
//! implement. It does not contain any implementations - those are provided by
//! separate crates (`swarmpilot-docker`, `swarmpilot-memory`).
//!
//! ## Overview
//!
//! The main trait is [`Orchestrator`], which defines the contract for:
//! - Listing and inspecting live services
//! - Creating, updating and removing services
//! - Fetching service logs
//!
//! ## Example
//!
//! ```ignore
//! use swarmpilot_orchestrator::{Orchestrator, OrchestratorError, LiveService};
//!
//! async fn find_service(
//!     orchestrator: &dyn Orchestrator,
//!     name: &str,
//! ) -> Result<LiveService, OrchestratorError> {
//!     orchestrator.get_service(name).await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::OrchestratorError;
pub use traits::Orchestrator;
pub use types::{
    LiveService, PortMapping, ServiceSpec, ServiceUpdate, env_lines_to_map, map_to_env_lines,
};

/// Type alias for an orchestrator result.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Type alias for a shared orchestrator trait object.
pub type DynOrchestrator = std::sync::Arc<dyn Orchestrator>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use swarmpilot_orchestrator::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::OrchestratorError;
    pub use crate::traits::Orchestrator;
    pub use crate::types::{
        LiveService, PortMapping, ServiceSpec, ServiceUpdate, env_lines_to_map, map_to_env_lines,
    };
    pub use crate::{DynOrchestrator, OrchestratorResult};
}
