use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use swarmpilot_api::{
    ApiError, ApiResult, BatchDeployResponse, ConfigDetail, ConfigPatch, DeployRequest,
    DeployResponse, HealthResponse, RegisterRequest, ServiceDetail, ServiceListResponse,
    StackSyncResponse, ports_from_wire, ports_to_wire,
};
use swarmpilot_orchestrator::{
    LiveService, ServiceSpec, ServiceUpdate, env_lines_to_map, map_to_env_lines,
};

use crate::server::AppState;

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Swarmpilot",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok".to_string(),
        uptime: state.started_at.elapsed().as_secs(),
    };
    (StatusCode::OK, Json(body))
}

fn detail(live: &LiveService) -> ServiceDetail {
    ServiceDetail {
        name: live.name.clone(),
        status: live.status.clone(),
        ports: ports_to_wire(&live.ports),
    }
}

// ---- Service management ----

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    pub status: Option<String>,
}

fn default_limit() -> usize {
    50
}

pub async fn list_services(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ServiceListResponse>> {
    let mut services = state.orchestrator.list_services().await?;
    if let Some(wanted) = &params.status {
        services.retain(|s| &s.status == wanted);
    }
    // Pagination happens here, not in the backend; total is pre-pagination
    let total = services.len();
    let services = services
        .iter()
        .skip(params.offset)
        .take(params.limit)
        .map(detail)
        .collect();
    Ok(Json(ServiceListResponse {
        services,
        total,
        limit: params.limit,
        offset: params.offset,
    }))
}

/// Derives the service name from the image reference.
///
/// Not user-chosen: registering `nginx:alpine` always yields the service
/// `nginx_alpine`. Kept for wire compatibility.
pub fn derive_service_name(image: &str) -> String {
    image.replace('/', "_").replace(':', "_")
}

pub async fn register_service(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ServiceDetail>)> {
    let ports = match &req.ports {
        Some(wire) => ports_from_wire(wire)?,
        None => Vec::new(),
    };
    // The `secrets` list rides through to the orchestrator as env lines
    let spec = ServiceSpec::new(derive_service_name(&req.image), &req.image)
        .with_ports(ports)
        .with_env(req.secrets.clone().unwrap_or_default());
    let live = state.orchestrator.create_service(&spec).await?;
    Ok((StatusCode::CREATED, Json(detail(&live))))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ServiceDetail>> {
    let live = state.orchestrator.get_service(&name).await?;
    Ok(Json(detail(&live)))
}

pub async fn remove_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.orchestrator.remove_service(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Deployment ----

pub async fn deploy_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<DeployResponse>> {
    state
        .orchestrator
        .update_service(&name, &ServiceUpdate::force_redeploy())
        .await?;
    Ok(Json(DeployResponse::ok(format!("{name} updated"))))
}

/// Redeploys each listed service; the envelope always succeeds and missing
/// names are reported per-item.
pub async fn batch_deploy(
    State(state): State<AppState>,
    Json(req): Json<DeployRequest>,
) -> Json<BatchDeployResponse> {
    let mut result = BatchDeployResponse::new();
    for name in req.services {
        let outcome = match state
            .orchestrator
            .update_service(&name, &ServiceUpdate::force_redeploy())
            .await
        {
            Ok(()) => DeployResponse::ok("updated"),
            Err(err) if err.is_not_found() => DeployResponse::failed("not found"),
            Err(err) => DeployResponse::failed(err.to_string()),
        };
        result.insert(name, outcome);
    }
    Json(result)
}

pub async fn rollback_service(Path(_name): Path<String>) -> Json<DeployResponse> {
    // Reserved endpoint, kept for API surface compatibility
    Json(DeployResponse::failed("rollback is not supported"))
}

// ---- Configuration ----

fn config_of(live: &LiveService) -> ConfigDetail {
    ConfigDetail {
        env: env_lines_to_map(&live.env),
        ports: ports_to_wire(&live.ports),
    }
}

pub async fn get_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ConfigDetail>> {
    let live = state.orchestrator.get_service(&name).await?;
    Ok(Json(config_of(&live)))
}

/// Env patch keys overwrite, unspecified keys are retained; a ports patch
/// fully replaces the port set.
pub async fn update_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(patch): Json<ConfigPatch>,
) -> ApiResult<Json<ConfigDetail>> {
    let live = state.orchestrator.get_service(&name).await?;

    let mut env = env_lines_to_map(&live.env);
    if let Some(overrides) = &patch.env {
        env.extend(overrides.clone());
    }
    let ports = match &patch.ports {
        Some(wire) => Some(ports_from_wire(wire)?),
        None => None,
    };

    let update = ServiceUpdate {
        image: None,
        env: Some(map_to_env_lines(&env)),
        ports,
        force: false,
    };
    state.orchestrator.update_service(&name, &update).await?;

    // Report what the orchestrator now holds, not what we asked for
    let live = state.orchestrator.get_service(&name).await?;
    Ok(Json(config_of(&live)))
}

// ---- Logs ----

#[derive(Debug, Deserialize)]
pub struct LogParams {
    #[serde(default = "default_tail")]
    pub tail: u32,
}

fn default_tail() -> u32 {
    100
}

pub async fn fetch_logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<LogParams>,
) -> ApiResult<String> {
    let logs = state.orchestrator.service_logs(&name, params.tail).await?;
    Ok(logs)
}

// ---- Stack sync ----

pub async fn sync_stack(State(state): State<AppState>) -> ApiResult<Json<StackSyncResponse>> {
    let status = state.reconciler.sync().await.map_err(ApiError::from)?;
    Ok(Json(StackSyncResponse { status }))
}
