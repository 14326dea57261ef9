use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use swarmpilot_memory::MemoryOrchestrator;
use swarmpilot_orchestrator::{Orchestrator, PortMapping, ServiceSpec};
use swarmpilot_server::{AppState, build_app};

fn test_state() -> (AppState, Arc<MemoryOrchestrator>) {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    let state = AppState::new(orchestrator.clone(), PathBuf::from("swarm-stack.yml"));
    (state, orchestrator)
}

async fn start_server(state: AppState) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>)
{
    let app = build_app(state);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn root_and_health_respond() {
    let (state, _) = test_state();
    let (base, shutdown_tx, handle) = start_server(state).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "Swarmpilot");
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/v1/health")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["uptime"].is_u64());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn list_paginates_client_side() {
    let (state, orchestrator) = test_state();
    for i in 0..5 {
        orchestrator.insert_running(ServiceSpec::new(format!("svc-{i}"), "busybox:stable"));
    }
    let (base, shutdown_tx, handle) = start_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/v1/services?limit=2&offset=1"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 5);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["offset"], 1);
    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["name"], "svc-1");
    assert_eq!(services[1]["name"], "svc-2");

    // Offset past the end yields an empty page, total unchanged
    let resp = client
        .get(format!("{base}/v1/services?limit=10&offset=5"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 5);
    assert!(body["services"].as_array().unwrap().is_empty());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn list_filters_by_status_before_paginating() {
    let (state, orchestrator) = test_state();
    for i in 0..3 {
        orchestrator.insert_running(ServiceSpec::new(format!("svc-{i}"), "busybox:stable"));
    }
    orchestrator.set_status("svc-1", "updating");
    let (base, shutdown_tx, handle) = start_server(state).await;

    let resp = reqwest::get(format!("{base}/v1/services?status=updating"))
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["services"][0]["name"], "svc-1");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn register_derives_name_from_image() {
    let (state, orchestrator) = test_state();
    let (base, shutdown_tx, handle) = start_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/v1/services"))
        .json(&serde_json::json!({
            "image": "nginx:alpine",
            "ports": {"8085": 80},
            "secrets": ["MODE=edge"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "nginx_alpine");
    assert_eq!(body["ports"]["8085"], 80);

    let live = orchestrator.get_service("nginx_alpine").await.unwrap();
    assert_eq!(live.env, vec!["MODE=edge".to_string()]);
    assert_eq!(live.ports, vec![PortMapping::new(8085, 80)]);

    // Same image again conflicts on the derived name
    let resp = client
        .post(format!("{base}/v1/services"))
        .json(&serde_json::json!({"image": "nginx:alpine"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn missing_services_map_to_404_without_side_effects() {
    let (state, orchestrator) = test_state();
    let (base, shutdown_tx, handle) = start_server(state).await;
    let client = reqwest::Client::new();

    for request in [
        client.get(format!("{base}/v1/services/ghost")),
        client.delete(format!("{base}/v1/services/ghost")),
        client.post(format!("{base}/v1/services/ghost/deploy")),
        client.get(format!("{base}/v1/services/ghost/config")),
        client.get(format!("{base}/v1/services/ghost/logs")),
    ] {
        let resp = request.send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], 404);
    }
    assert_eq!(orchestrator.update_call_count(), 0);
    assert_eq!(orchestrator.remove_call_count(), 0);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn remove_returns_204_then_404() {
    let (state, orchestrator) = test_state();
    orchestrator.insert_running(ServiceSpec::new("web", "nginx:alpine"));
    let (base, shutdown_tx, handle) = start_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .delete(format!("{base}/v1/services/web"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .get(format!("{base}/v1/services/web"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn deploy_forces_a_rolling_update() {
    let (state, orchestrator) = test_state();
    orchestrator.insert_running(ServiceSpec::new("web", "nginx:alpine"));
    let (base, shutdown_tx, handle) = start_server(state).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/v1/services/web/deploy"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "web updated");
    assert_eq!(orchestrator.generation("web"), Some(1));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn batch_deploy_reports_per_name_outcomes() {
    let (state, orchestrator) = test_state();
    orchestrator.insert_running(ServiceSpec::new("svc-a", "busybox:stable"));
    let (base, shutdown_tx, handle) = start_server(state).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/v1/deploy"))
        .json(&serde_json::json!({"services": ["svc-a", "missing-svc"]}))
        .send()
        .await
        .unwrap();
    // The envelope always succeeds
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["svc-a"]["status"], "ok");
    assert_eq!(body["svc-a"]["message"], "updated");
    assert_eq!(body["missing-svc"]["status"], "failed");
    assert_eq!(body["missing-svc"]["message"], "not found");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn config_patch_merges_env_and_replaces_ports() {
    let (state, orchestrator) = test_state();
    orchestrator.insert_running(
        ServiceSpec::new("web", "nginx:alpine")
            .with_ports(vec![PortMapping::new(8085, 80)])
            .with_env(vec!["A=1".to_string()]),
    );
    let (base, shutdown_tx, handle) = start_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/v1/services/web/config"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["env"]["A"], "1");
    assert_eq!(body["ports"]["8085"], 80);

    // Env patch keys overwrite, unspecified keys are retained
    let resp = client
        .patch(format!("{base}/v1/services/web/config"))
        .json(&serde_json::json!({"env": {"K": "V"}}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["env"]["A"], "1");
    assert_eq!(body["env"]["K"], "V");
    assert_eq!(body["ports"]["8085"], 80);

    // A ports patch fully replaces the port set
    let resp = client
        .patch(format!("{base}/v1/services/web/config"))
        .json(&serde_json::json!({"ports": {"9090": 9090}}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ports"]["9090"], 9090);
    assert!(body["ports"].get("8085").is_none());
    // Env untouched by a ports-only patch
    assert_eq!(body["env"]["K"], "V");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn logs_return_plain_text_tail() {
    let (state, orchestrator) = test_state();
    orchestrator.insert_running(ServiceSpec::new("web", "nginx:alpine"));
    orchestrator.set_logs("web", "one\ntwo\nthree");
    let (base, shutdown_tx, handle) = start_server(state).await;

    let resp = reqwest::get(format!("{base}/v1/services/web/logs?tail=2"))
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "two\nthree");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn rollback_is_an_explicit_stub() {
    let (state, orchestrator) = test_state();
    orchestrator.insert_running(ServiceSpec::new("web", "nginx:alpine"));
    let (base, shutdown_tx, handle) = start_server(state).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/v1/services/web/rollback"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["message"], "rollback is not supported");
    assert_eq!(orchestrator.update_call_count(), 0);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
