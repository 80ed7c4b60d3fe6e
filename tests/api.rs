// ---------------------------------------------------------------------------
// Integration tests for the HTTP API
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use netprobe::config::Config;
use netprobe::scanner::PortSet;
use netprobe::server::{build_router, AppState};
use netprobe::tools::Allowlist;

fn test_config() -> Config {
    let mut config = Config::default();
    config.scanner.timeout_ms = 500;
    config.commands.timeout_secs = 1;
    config
}

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::from_config(&test_config()))
}

fn state_with_allowlist(allowlist: Allowlist) -> Arc<AppState> {
    Arc::new(AppState::from_config(&test_config()).with_allowlist(allowlist))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn execute_request(command: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/execute")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "command": command }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_router(test_state());
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn scan_without_host_is_bad_request() {
    let app = build_router(test_state());
    let response = app.oneshot(get("/api/scan")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], true);
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Host parameter required");
}

#[tokio::test]
async fn scan_with_blank_host_is_bad_request() {
    let app = build_router(test_state());
    let response = app.oneshot(get("/api/scan?host=%20%20")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scan_reports_local_listener() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();

    let mut config = test_config();
    config.scanner.ports = PortSet::new([u32::from(open), 1]).unwrap();
    let app = build_router(Arc::new(AppState::from_config(&config)));

    let response = app.oneshot(get("/api/scan?host=127.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["error"], false);
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["host"], "127.0.0.1");
    assert_eq!(json["data"]["open_ports"], serde_json::json!([open]));
    assert_eq!(json["data"]["total_scanned"], 2);
}

#[tokio::test]
async fn lookup_without_ip_is_bad_request() {
    let app = build_router(test_state());
    let response = app.oneshot(get("/api/lookup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "IP parameter required");
}

#[tokio::test]
async fn lookup_with_hostname_is_bad_request() {
    let app = build_router(test_state());
    let response = app.oneshot(get("/api/lookup?ip=example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dns_without_domain_is_bad_request() {
    let app = build_router(test_state());
    let response = app.oneshot(get("/api/dns")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Domain parameter required");
}

#[tokio::test]
async fn execute_empty_command_is_bad_request() {
    let app = build_router(test_state());
    let response = app.oneshot(execute_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn execute_malformed_body_is_bad_request() {
    let app = build_router(test_state());
    let request = Request::builder()
        .method("POST")
        .uri("/api/execute")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], true);
}

#[tokio::test]
async fn execute_unlisted_command_is_forbidden() {
    let app = build_router(test_state());
    let response = app.oneshot(execute_request("rm -rf /")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["error"], true);
    assert!(json["message"].as_str().unwrap().contains("not in the allowlist"));
}

#[tokio::test]
async fn execute_chained_command_is_forbidden() {
    let app = build_router(test_state());
    let response = app.oneshot(execute_request("cat /etc/passwd; ls")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn execute_namespace_exec_is_forbidden_by_default() {
    let app = build_router(test_state());
    let response = app
        .clone()
        .oneshot(execute_request("ip netns add scratch"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(execute_request("ip netns exec scratch id"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("'ip'"));
}

#[cfg(unix)]
#[tokio::test]
async fn execute_allowlisted_command_succeeds() {
    let app = build_router(test_state());
    let response = app
        .oneshot(execute_request("echo \"a; rm -rf /\""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["error"], false);
    assert_eq!(json["status"], "success");
    assert_eq!(json["exit_code"], 0);
    assert_eq!(json["output"], "a; rm -rf /\n");
}

#[cfg(unix)]
#[tokio::test]
async fn execute_nonzero_exit_reports_error_status() {
    let state = state_with_allowlist(Allowlist::new([("false", "Exit with failure")]));
    let app = build_router(state);
    let response = app.oneshot(execute_request("false")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["error"], false);
    assert_eq!(json["status"], "error");
    assert_eq!(json["exit_code"], 1);
}

#[cfg(unix)]
#[tokio::test]
async fn execute_timeout_returns_408_with_partial_output() {
    let state = state_with_allowlist(Allowlist::new([("sh", "Shell for tests")]));
    let app = build_router(state);

    let start = std::time::Instant::now();
    let response = app
        .oneshot(execute_request("sh -c \"echo started; sleep 30\""))
        .await
        .unwrap();
    assert!(start.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    let json = body_json(response).await;
    assert_eq!(json["error"], true);
    assert_eq!(json["status"], "error");
    assert!(json["output"].as_str().unwrap().contains("started"));
    assert!(json.get("error_output").is_some());
}

#[tokio::test]
async fn commands_lists_allowlist() {
    let app = build_router(test_state());
    let response = app.oneshot(get("/api/commands")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"ping"));
    assert!(names.contains(&"dig"));
    assert!(!names.contains(&"rm"));
}

#[tokio::test]
async fn tools_catalog_routes() {
    let app = build_router(test_state());

    let response = app.clone().oneshot(get("/api/tools")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["id"], "port_scanner");

    let response = app.clone().oneshot(get("/api/tools/ip_lookup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "IP Lookup");

    let response = app.clone().oneshot(get("/api/tools/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/api/tools/category/network")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn metrics_route_follows_config() {
    let _ = netprobe::metrics::init();

    let app = build_router(test_state());
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = test_config();
    config.metrics.enabled = false;
    let app = build_router(Arc::new(AppState::from_config(&config)));
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
