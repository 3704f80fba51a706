//! HTTP surface tests: spins up the real axum server on a random port and
//! exercises the JSON endpoints, the HTMX fragment endpoints, and the
//! Markdown export over raw HTTP.

use matrixd::{config::ServerConfig, rest::build_router, storage::TaskStore, AppContext};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Start a server on a random port; returns its address and the data dir
/// guard (dropping the TempDir deletes the database).
async fn start_test_server() -> (String, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(ServerConfig::new(
        Some(0),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        None,
    ));
    let store = TaskStore::new(dir.path()).await.unwrap();
    let ctx = Arc::new(AppContext::new(config, store));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (format!("127.0.0.1:{}", addr.port()), dir)
}

/// Send one HTTP/1.1 request and return (status, body). `Connection: close`
/// lets us read the response to EOF.
async fn request(addr: &str, method: &str, path: &str, body: Option<&str>) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let body = body.unwrap_or("");
    let req = format!(
        "{method} {path} HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Connection: close\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let response = String::from_utf8_lossy(&raw).to_string();

    let status: u16 = response
        .split_whitespace()
        .nth(1)
        .expect("malformed status line")
        .parse()
        .unwrap();
    let payload = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, payload)
}

async fn create_task(addr: &str, title: &str, quadrant: i64) -> Value {
    let body = format!(r#"{{"title": "{title}", "quadrant": {quadrant}}}"#);
    let (status, payload) = request(addr, "POST", "/api/tasks", Some(&body)).await;
    assert_eq!(status, 200, "create failed: {payload}");
    serde_json::from_str(&payload).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (addr, _dir) = start_test_server().await;
    let (status, payload) = request(&addr, "GET", "/api/health", None).await;
    assert_eq!(status, 200);
    let v: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(v["status"], "ok");
    assert!(v["version"].is_string());
}

#[tokio::test]
async fn create_get_list_roundtrip() {
    let (addr, _dir) = start_test_server().await;
    let created = create_task(&addr, "buy milk", 3).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["position"], 0);
    assert_eq!(created["completed"], false);

    let (status, payload) = request(&addr, "GET", &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, 200);
    let fetched: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(fetched["title"], "buy milk");
    assert_eq!(fetched["quadrant"], 3);

    let (status, payload) = request(&addr, "GET", "/api/tasks", None).await;
    assert_eq!(status, 200);
    let list: Vec<Value> = serde_json::from_str(&payload).unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn missing_task_is_404_with_error_envelope() {
    let (addr, _dir) = start_test_server().await;
    let (status, payload) = request(&addr, "GET", "/api/tasks/9999", None).await;
    assert_eq!(status, 404);
    let v: Value = serde_json::from_str(&payload).unwrap();
    assert!(v["error"].as_str().unwrap().contains("not found"));

    let (status, _) = request(&addr, "DELETE", "/api/tasks/9999", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn invalid_quadrant_is_rejected_with_400() {
    let (addr, _dir) = start_test_server().await;
    let (status, payload) = request(
        &addr,
        "POST",
        "/api/tasks",
        Some(r#"{"title": "bad", "quadrant": 5}"#),
    )
    .await;
    assert_eq!(status, 400);
    let v: Value = serde_json::from_str(&payload).unwrap();
    assert!(v["error"].as_str().unwrap().contains("quadrant"));

    // Nothing was inserted.
    let (_, payload) = request(&addr, "GET", "/api/tasks", None).await;
    let list: Vec<Value> = serde_json::from_str(&payload).unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn put_replaces_all_fields() {
    let (addr, _dir) = start_test_server().await;
    let created = create_task(&addr, "draft", 1).await;
    let id = created["id"].as_i64().unwrap();

    let body = r#"{"title": "final", "description": "reviewed", "quadrant": 1, "completed": true, "due_date": "2026-09-15"}"#;
    let (status, payload) = request(&addr, "PUT", &format!("/api/tasks/{id}"), Some(body)).await;
    assert_eq!(status, 200);
    let updated: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(updated["title"], "final");
    assert_eq!(updated["description"], "reviewed");
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["due_date"], "2026-09-15");
}

#[tokio::test]
async fn patch_returns_card_fragment_with_new_state() {
    let (addr, _dir) = start_test_server().await;
    let created = create_task(&addr, "toggle me", 2).await;
    let id = created["id"].as_i64().unwrap();

    let (status, html) = request(
        &addr,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(r#"{"completed": true}"#),
    )
    .await;
    assert_eq!(status, 200);
    assert!(html.contains("task-card completed"));
    assert!(html.contains(&format!("data-id=\"{id}\"")));
}

#[tokio::test]
async fn quadrant_fragment_lists_cards_in_position_order() {
    let (addr, _dir) = start_test_server().await;
    let a = create_task(&addr, "alpha", 4).await;
    let b = create_task(&addr, "beta", 4).await;

    let (status, html) = request(&addr, "GET", "/api/tasks/quadrant/4", None).await;
    assert_eq!(status, 200);
    let pa = html
        .find(&format!("data-id=\"{}\"", a["id"]))
        .expect("alpha card");
    let pb = html
        .find(&format!("data-id=\"{}\"", b["id"]))
        .expect("beta card");
    assert!(pa < pb);

    let (status, _) = request(&addr, "GET", "/api/tasks/quadrant/9", None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn move_endpoint_appends_to_destination() {
    let (addr, _dir) = start_test_server().await;
    create_task(&addr, "resident", 2).await;
    let mover = create_task(&addr, "mover", 1).await;
    let id = mover["id"].as_i64().unwrap();

    let (status, html) = request(
        &addr,
        "PATCH",
        &format!("/api/tasks/{id}/quadrant"),
        Some(r#"{"quadrant": 2}"#),
    )
    .await;
    assert_eq!(status, 200);
    assert!(html.contains(&format!("data-id=\"{id}\"")));

    let (_, payload) = request(&addr, "GET", &format!("/api/tasks/{id}"), None).await;
    let moved: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(moved["quadrant"], 2);
    assert_eq!(moved["position"], 1);
}

#[tokio::test]
async fn reorder_endpoint_applies_new_order() {
    let (addr, _dir) = start_test_server().await;
    let a = create_task(&addr, "a", 3).await;
    let b = create_task(&addr, "b", 3).await;
    let c = create_task(&addr, "c", 3).await;

    let body = format!(r#"{{"task_ids": [{}, {}, {}]}}"#, c["id"], b["id"], a["id"]);
    let (status, html) =
        request(&addr, "PATCH", "/api/tasks/quadrant/3/reorder", Some(&body)).await;
    assert_eq!(status, 200);
    let pc = html.find(&format!("data-id=\"{}\"", c["id"])).unwrap();
    let pb = html.find(&format!("data-id=\"{}\"", b["id"])).unwrap();
    let pa = html.find(&format!("data-id=\"{}\"", a["id"])).unwrap();
    assert!(pc < pb && pb < pa);

    // Empty id list is a client error.
    let (status, _) = request(
        &addr,
        "PATCH",
        "/api/tasks/quadrant/3/reorder",
        Some(r#"{"task_ids": []}"#),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn export_downloads_grouped_markdown() {
    let (addr, _dir) = start_test_server().await;
    create_task(&addr, "urgent thing", 1).await;
    let done = create_task(&addr, "finished thing", 2).await;
    let id = done["id"].as_i64().unwrap();
    request(
        &addr,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(r#"{"completed": true}"#),
    )
    .await;

    let mut stream = TcpStream::connect(&addr).await.unwrap();
    let req = format!(
        "GET /api/export HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(req.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let response = String::from_utf8_lossy(&raw).to_string();

    assert!(response.contains("content-disposition") || response.contains("Content-Disposition"));
    assert!(response.contains("eisenhower-"));
    assert!(response.contains("# Eisenhower Matrix"));
    assert!(response.contains("- [ ] urgent thing"));
    assert!(response.contains("- [x] finished thing"));
    // Empty quadrants render the placeholder.
    assert!(response.contains("## Q4 · Neither"));
    assert!(response.contains("—"));
}
