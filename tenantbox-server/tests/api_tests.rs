use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tenantbox_core::{
    catalog::TemplateCatalog,
    runtime::{
        fake::{FailPoint, FakeRuntime, RuntimeCall},
        ContainerDetails, ContainerRecord, ContainerRuntime, ContainerSpec, LogRequest, LogStream,
        RuntimeError, VolumeRecord,
    },
};
use tenantbox_server::{create_router, AppState, Config};
use tower::ServiceExt;

//--------------------------------------------------------------------------------------------------
// Helpers
//--------------------------------------------------------------------------------------------------

const IMAGES: [&str; 2] = ["app_template:latest", "note_template:latest"];

fn config() -> Config {
    Config::new("127.0.0.1", 8080).expect("default config is valid")
}

fn app(runtime: &FakeRuntime) -> Router {
    app_with(Arc::new(runtime.clone()), config())
}

fn app_with(runtime: Arc<dyn ContainerRuntime>, config: Config) -> Router {
    let state = AppState::new(
        Arc::new(config),
        runtime,
        Arc::new(TemplateCatalog::builtin()),
    );
    create_router(state)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if body.is_some() {
        request = request.header(header::CONTENT_TYPE, "application/json");
    }

    let request = request
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .expect("request builds");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body is readable")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).expect("every response is JSON");

    (status, json)
}

async fn launch(router: &Router, template: &str) -> Value {
    let body = format!("{{\"template\": \"{}\"}}", template);
    let (status, json) = send(router, Method::POST, "/api/launch", Some(&body)).await;
    assert_eq!(status, StatusCode::OK, "launch failed: {}", json);
    json
}

fn str_field<'a>(json: &'a Value, field: &str) -> &'a str {
    json[field].as_str().unwrap_or_default()
}

/// Delegates to a [`FakeRuntime`] but never finishes listing containers.
struct HangingRuntime(FakeRuntime);

#[async_trait]
impl ContainerRuntime for HangingRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.0.ping().await
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        self.0.image_exists(image).await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.0.create_container(spec).await
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.0.start_container(id).await
    }

    async fn stop_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError> {
        self.0.stop_container(id, grace_secs).await
    }

    async fn restart_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError> {
        self.0.restart_container(id, grace_secs).await
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        self.0.remove_container(id, force).await
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        self.0.inspect_container(id).await
    }

    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerRecord>, RuntimeError> {
        std::future::pending::<Result<Vec<ContainerRecord>, RuntimeError>>().await
    }

    fn container_logs(&self, id: &str, request: &LogRequest) -> LogStream {
        self.0.container_logs(id, request)
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, RuntimeError> {
        self.0.list_volumes().await
    }

    async fn remove_volume(&self, name: &str) -> Result<(), RuntimeError> {
        self.0.remove_volume(name).await
    }
}

//--------------------------------------------------------------------------------------------------
// Tests: Launch
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_launch_assigns_fresh_tenant_identity() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);

    let first = launch(&router, "app_template").await;
    let second = launch(&router, "app_template").await;

    let tenant = str_field(&first, "tenant_id");
    assert!(!tenant.is_empty());
    assert_ne!(tenant, str_field(&second, "tenant_id"));
    assert_eq!(str_field(&first, "url"), format!("http://{}.localhost", tenant));
    assert_eq!(str_field(&first, "message"), "Basic Web App container launched!");
    assert_eq!(first["template"]["id"], "app_template");

    let spec = runtime
        .container_spec(str_field(&first, "container_id"))
        .expect("container was created");
    assert_eq!(spec.labels["traefik.enable"], "true");
    assert_eq!(
        spec.labels[&format!("traefik.http.routers.{}.rule", tenant)],
        format!("Host(`{}.localhost`)", tenant)
    );
    assert_eq!(
        spec.labels[&format!("traefik.http.services.{}.loadbalancer.server.port", tenant)],
        "8081"
    );
    assert_eq!(spec.labels["template.id"], "app_template");
    assert_eq!(spec.labels["template.name"], "Basic Web App");
    assert_eq!(spec.network, "dev_container_default");
    assert_eq!(spec.volume_mounts.len(), 1);
    assert_eq!(spec.volume_mounts[0].source, format!("tenant_data_{}", tenant));
    assert_eq!(spec.volume_mounts[0].target, "/app/data");
    assert_eq!(runtime.is_running(str_field(&first, "container_id")), Some(true));
}

#[tokio::test]
async fn test_launch_unknown_template_falls_back_to_first() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);

    let launched = launch(&router, "does-not-exist").await;
    assert_eq!(launched["template"]["id"], "app_template");
    assert_eq!(
        str_field(&launched, "message"),
        "Basic Web App container launched!"
    );
}

#[tokio::test]
async fn test_launch_tolerates_missing_or_malformed_body() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);

    for body in [None, Some(""), Some("not json"), Some("{\"template\": null}")] {
        let (status, json) = send(&router, Method::POST, "/launch", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["template"]["id"], "app_template");
    }

    let note = launch(&router, "note_template").await;
    assert_eq!(str_field(&note, "message"), "Notes App container launched!");
    assert_eq!(runtime.container_ids().len(), 5);
}

#[tokio::test]
async fn test_launch_without_image_creates_nothing() {
    let runtime = FakeRuntime::with_images(["note_template:latest"]);
    let router = app(&runtime);

    let (status, json) = send(&router, Method::POST, "/api/launch", Some("{}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        str_field(&json, "error"),
        "Image not found: app_template:latest. Please build the Basic Web App image first."
    );
    assert!(runtime.container_ids().is_empty());
    assert!(!runtime
        .calls()
        .iter()
        .any(|c| matches!(c, RuntimeCall::Create(_))));
}

#[tokio::test]
async fn test_launch_start_failure_rolls_back() {
    let runtime = FakeRuntime::with_images(IMAGES);
    runtime.fail(FailPoint::Start);
    let router = app(&runtime);

    let (status, json) = send(&router, Method::POST, "/api/launch", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(str_field(&json, "error").starts_with("Failed to start container"));
    assert!(runtime.container_ids().is_empty());
    assert!(runtime.volume_names().is_empty());
}

#[tokio::test]
async fn test_launch_start_failure_without_rollback_leaves_container() {
    let runtime = FakeRuntime::with_images(IMAGES);
    runtime.fail(FailPoint::Start);
    let router = app_with(
        Arc::new(runtime.clone()),
        config().with_launch_rollback(false),
    );

    let (status, _) = send(&router, Method::POST, "/api/launch", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(runtime.container_ids().len(), 1);
    assert_eq!(runtime.volume_names().len(), 1);
}

#[tokio::test]
async fn test_launch_past_deadline_removes_created_container() {
    let runtime = FakeRuntime::with_images(IMAGES);
    runtime.fail(FailPoint::StallStart);
    let config = config()
        .with_request_timeout(Duration::from_millis(50))
        .expect("timeout is valid");
    let router = app_with(Arc::new(runtime.clone()), config);

    let (status, json) = send(&router, Method::POST, "/api/launch", None).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"], "Request timed out after 50ms");

    for _ in 0..200 {
        if runtime.container_ids().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(runtime.container_ids().is_empty());
    assert!(runtime.volume_names().is_empty());
}

#[tokio::test]
async fn test_launch_body_over_limit_is_json() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let body = format!("{{\"template\": \"{}\"}}", "x".repeat(3 * 1024 * 1024));

    let (status, json) = send(&router, Method::POST, "/api/launch", Some(&body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!str_field(&json, "error").is_empty());
    assert!(runtime.calls().is_empty());
}

//--------------------------------------------------------------------------------------------------
// Tests: Listing
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_list_includes_launched_and_excludes_foreign() {
    let runtime = FakeRuntime::with_images(IMAGES);
    runtime.add_foreign_container(
        "f00dfeedf00dfeed",
        "postgres:16",
        [("com.example.role".to_string(), "db".to_string())].into(),
    );
    let router = app(&runtime);

    let launched = launch(&router, "note_template").await;

    let (status, json) = send(&router, Method::GET, "/api/containers", None).await;
    assert_eq!(status, StatusCode::OK);

    let containers = json["containers"].as_array().expect("containers is a list");
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0]["full_id"], launched["container_id"]);
    assert_eq!(containers[0]["tenant_id"], launched["tenant_id"]);
    assert_eq!(containers[0]["url"], launched["url"]);
    assert_eq!(containers[0]["template_id"], "note_template");
    assert_eq!(containers[0]["template_name"], "Notes App");
    assert_eq!(str_field(&containers[0], "id").len(), 12);
}

#[tokio::test]
async fn test_list_templates_in_catalog_order() {
    let router = app(&FakeRuntime::new());

    let (status, json) = send(&router, Method::GET, "/api/templates", None).await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<&str> = json["templates"]
        .as_array()
        .expect("templates is a list")
        .iter()
        .map(|t| t["id"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(ids, ["app_template", "note_template"]);
    assert_eq!(json["templates"][0]["port"], "8081");
}

#[tokio::test]
async fn test_health() {
    let router = app(&FakeRuntime::new());

    let (status, json) = send(&router, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Service is healthy");
}

//--------------------------------------------------------------------------------------------------
// Tests: Lifecycle
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_delete_unknown_container_changes_nothing() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    launch(&router, "app_template").await;
    let before = runtime.container_ids();
    runtime.clear_calls();

    let (status, json) = send(&router, Method::DELETE, "/api/launch/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_field(&json, "error"), "Container not found: nope");
    assert_eq!(runtime.container_ids(), before);
    assert!(!runtime
        .calls()
        .iter()
        .any(|c| matches!(c, RuntimeCall::Stop(..) | RuntimeCall::Remove(..))));
}

#[tokio::test]
async fn test_delete_keeps_volume() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");

    let (status, json) = send(&router, Method::DELETE, &format!("/api/launch/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Container deleted successfully");
    assert!(json.get("warning").is_none());

    let (_, listed) = send(&router, Method::GET, "/api/containers", None).await;
    assert_eq!(listed["containers"].as_array().map(Vec::len), Some(0));

    let (status, volumes) = send(&router, Method::GET, "/api/volumes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(volumes["volumes"][0]["tenant_id"], launched["tenant_id"]);
    assert_eq!(
        str_field(&volumes["volumes"][0], "name"),
        format!("tenant_data_{}", str_field(&launched, "tenant_id"))
    );
}

#[tokio::test]
async fn test_delete_reports_failed_stop_as_warning() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");
    runtime.fail(FailPoint::Stop);

    let (status, json) = send(&router, Method::DELETE, &format!("/api/launch/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(str_field(&json, "warning").starts_with("Failed to stop container gracefully"));
    assert!(runtime.container_ids().is_empty());
}

#[tokio::test]
async fn test_invalid_action_is_rejected_before_runtime() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");
    runtime.clear_calls();

    let (status, json) = send(
        &router,
        Method::POST,
        &format!("/api/containers/{}/pause", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        str_field(&json, "error"),
        "Invalid action. Use start, stop, or restart"
    );
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn test_posting_to_read_routes_is_an_invalid_action() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");
    runtime.clear_calls();

    for action in ["logs", "inspect"] {
        let (status, json) = send(
            &router,
            Method::POST,
            &format!("/api/containers/{}/{}", id, action),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            str_field(&json, "error"),
            "Invalid action. Use start, stop, or restart"
        );
    }
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn test_restart_failure_is_server_error() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");
    runtime.fail(FailPoint::Restart);

    let (status, json) = send(
        &router,
        Method::POST,
        &format!("/api/containers/{}/restart", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(str_field(&json, "error").starts_with("Failed to restart container"));
}

#[tokio::test]
async fn test_stop_then_inspect_reports_not_running() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");

    let (status, json) = send(
        &router,
        Method::POST,
        &format!("/api/containers/{}/stop", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Container stopped successfully");
    assert_eq!(json["action"], "stop");

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("/api/containers/{}/inspect", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["container_id"], id);
    assert_eq!(json["details"]["state"]["Running"], false);

    let (status, json) = send(
        &router,
        Method::POST,
        &format!("/api/containers/{}/start", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Container started successfully");
    assert_eq!(runtime.is_running(id), Some(true));
}

#[tokio::test]
async fn test_control_unknown_container_is_not_found() {
    let router = app(&FakeRuntime::new());

    let (status, json) = send(&router, Method::POST, "/api/containers/nope/restart", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_field(&json, "error"), "Container not found: nope");
}

#[tokio::test]
async fn test_logs_are_bounded() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");
    runtime.set_logs(id, vec![Bytes::from(vec![b'a'; 1000]); 20]);

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("/api/containers/{}/logs", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let logs = str_field(&json, "logs");
    assert!(!logs.is_empty());
    assert!(logs.len() <= 8192);
    assert_eq!(json["container_id"], id);
}

#[tokio::test]
async fn test_empty_logs_use_placeholder() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);
    let launched = launch(&router, "app_template").await;
    let id = str_field(&launched, "container_id");

    let (status, json) = send(
        &router,
        Method::GET,
        &format!("/api/containers/{}/logs", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["logs"], "No logs available");
}

//--------------------------------------------------------------------------------------------------
// Tests: Errors
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let router = app(&FakeRuntime::new());

    let (status, json) = send(&router, Method::GET, "/api/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Not found");
}

#[tokio::test]
async fn test_wrong_method_is_json_method_not_allowed() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);

    for (method, uri) in [
        (Method::DELETE, "/api/health"),
        (Method::GET, "/api/launch"),
        (Method::PUT, "/api/containers/abc/logs"),
        (Method::GET, "/launch"),
    ] {
        let (status, json) = send(&router, method, uri, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
        assert_eq!(json["error"], "Method not allowed");
    }
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn test_delete_without_id_is_bad_request() {
    let runtime = FakeRuntime::with_images(IMAGES);
    let router = app(&runtime);

    let (status, json) = send(&router, Method::DELETE, "/api/launch/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Container ID is required");
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn test_unavailable_runtime_is_server_error() {
    let runtime = FakeRuntime::new();
    runtime.fail(FailPoint::Unavailable);
    let router = app(&runtime);

    let (status, json) = send(&router, Method::GET, "/api/containers", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(str_field(&json, "error").contains("unavailable"));
}

#[tokio::test]
async fn test_slow_runtime_hits_deadline() {
    let config = config()
        .with_request_timeout(Duration::from_millis(50))
        .expect("timeout is valid");
    let router = app_with(Arc::new(HangingRuntime(FakeRuntime::new())), config);

    let (status, json) = send(&router, Method::GET, "/api/containers", None).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"], "Request timed out after 50ms");

    let (status, _) = send(&router, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
