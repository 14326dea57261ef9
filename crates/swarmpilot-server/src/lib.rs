pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod reconcile;
pub mod server;

pub use config::{
    AppConfig, LoggingConfig, OrchestratorBackend, OrchestratorConfig, ServerConfig, StackConfig,
};
pub use observability::{apply_logging_level, init_tracing};
pub use reconcile::{StackReconciler, SyncError};
pub use server::{AppState, ServerBuilder, SwarmpilotServer, build_app};
