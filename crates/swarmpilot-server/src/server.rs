use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use swarmpilot_docker::DockerOrchestrator;
use swarmpilot_memory::MemoryOrchestrator;
use swarmpilot_orchestrator::DynOrchestrator;

use crate::config::{AppConfig, OrchestratorBackend};
use crate::handlers;
use crate::middleware as app_middleware;
use crate::reconcile::StackReconciler;

/// Shared state handed to every handler.
///
/// No caches and no locks live here: the orchestrator is the system of
/// record, and each request goes straight to it.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: DynOrchestrator,
    pub reconciler: Arc<StackReconciler>,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: DynOrchestrator, stack_file: PathBuf) -> Self {
        let reconciler = Arc::new(StackReconciler::new(orchestrator.clone(), stack_file));
        Self {
            orchestrator,
            reconciler,
            started_at: Instant::now(),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/v1/health", get(handlers::health))
        .route(
            "/v1/services",
            get(handlers::list_services).post(handlers::register_service),
        )
        .route(
            "/v1/services/{name}",
            get(handlers::get_service).delete(handlers::remove_service),
        )
        .route("/v1/services/{name}/deploy", post(handlers::deploy_service))
        .route("/v1/deploy", post(handlers::batch_deploy))
        .route(
            "/v1/services/{name}/config",
            get(handlers::get_config).patch(handlers::update_config),
        )
        .route("/v1/services/{name}/logs", get(handlers::fetch_logs))
        .route(
            "/v1/services/{name}/rollback",
            post(handlers::rollback_service),
        )
        .route("/v1/stack/sync", post(handlers::sync_stack))
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    orchestrator: Option<DynOrchestrator>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    #[must_use]
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            orchestrator: None,
        }
    }

    #[must_use]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    #[must_use]
    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Overrides the backend chosen by configuration, mainly for tests.
    #[must_use]
    pub fn with_orchestrator(mut self, orchestrator: DynOrchestrator) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn build(self) -> SwarmpilotServer {
        let orchestrator = self.orchestrator.unwrap_or_else(|| {
            match self.config.orchestrator.backend {
                OrchestratorBackend::Docker => {
                    Arc::new(DockerOrchestrator::new(&self.config.orchestrator.endpoint))
                }
                OrchestratorBackend::Memory => Arc::new(MemoryOrchestrator::new()),
            }
        });
        tracing::info!(
            backend = orchestrator.backend_name(),
            stack_file = %self.config.stack.file.display(),
            "orchestrator configured"
        );
        let state = AppState::new(orchestrator, self.config.stack.file.clone());
        let app = build_app(state);

        SwarmpilotServer {
            addr: self.addr,
            app,
        }
    }
}

pub struct SwarmpilotServer {
    addr: SocketAddr,
    app: Router,
}

impl SwarmpilotServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
