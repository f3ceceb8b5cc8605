//! Integration tests for the task REST API.
//! Spins up a real server on a free port and drives it over HTTP.

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use taskboard::{config::ServerConfig, rest, storage::Storage, AppContext};
use tempfile::TempDir;

/// Start a server on a random port and return its base URL.
/// The TempDir must stay alive for the duration of the test.
async fn start_test_server() -> (String, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(ServerConfig::new(
        Some(0),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        None,
    ));
    let storage = Arc::new(Storage::new(dir.path()).await.unwrap());
    let ctx = Arc::new(AppContext {
        config,
        storage,
        started_at: std::time::Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = rest::build_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), dir)
}

async fn create_task(client: &reqwest::Client, base: &str, body: Value) -> Value {
    let resp = client
        .post(format!("{base}/api/tasks"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn create_applies_defaults_and_round_trips() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let body = create_task(&client, &base, json!({ "title": "Buy milk" })).await;
    let task = &body["task"];
    assert_eq!(task["title"], "Buy milk");
    assert_eq!(task["description"], "");
    assert_eq!(task["status"], "TODO");
    assert_eq!(task["priority"], "Normal");
    let id = task["id"].as_i64().unwrap();
    assert!(id > 0);

    let resp = client
        .get(format!("{base}/api/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["task"]["title"], "Buy milk");
    assert_eq!(body["task"]["id"], id);
}

#[tokio::test]
async fn create_echoes_caller_supplied_fields() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let body = create_task(
        &client,
        &base,
        json!({ "title": "Deploy", "description": "to prod", "priority": "HIGH" }),
    )
    .await;
    assert_eq!(body["task"]["description"], "to prod");
    assert_eq!(body["task"]["priority"], "HIGH");
    assert_eq!(body["task"]["status"], "TODO");
}

#[tokio::test]
async fn create_requires_a_non_blank_title() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({ "title": "" }), json!({ "title": "   " })] {
        let resp = client
            .post(format!("{base}/api/tasks"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Title is required");
    }

    // No rows were created by the rejected requests.
    let resp = client.get(format!("{base}/api/tasks")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tasks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn list_returns_tasks_newest_first() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    for title in ["first", "second", "third"] {
        create_task(&client, &base, json!({ "title": title })).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let resp = client.get(format!("{base}/api/tasks")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let titles: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn missing_ids_return_404_everywhere() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let get = client.get(format!("{base}/api/tasks/9999")).send().await.unwrap();
    assert_eq!(get.status(), StatusCode::NOT_FOUND);
    let body: Value = get.json().await.unwrap();
    assert_eq!(body["error"], "Task not found");

    let put = client
        .put(format!("{base}/api/tasks/9999"))
        .json(&json!({ "title": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::NOT_FOUND);

    let patch = client
        .patch(format!("{base}/api/tasks/9999/status"))
        .json(&json!({ "status": "DONE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(patch.status(), StatusCode::NOT_FOUND);

    let delete = client
        .delete(format!("{base}/api/tasks/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partial_update_touches_only_supplied_fields() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let created = create_task(
        &client,
        &base,
        json!({ "title": "Write report", "description": "draft", "priority": "HIGH" }),
    )
    .await;
    let id = created["task"]["id"].as_i64().unwrap();

    let resp = client
        .put(format!("{base}/api/tasks/{id}"))
        .json(&json!({ "description": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Task updated successfully");

    let body: Value = client
        .get(format!("{base}/api/tasks/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["task"]["title"], "Write report");
    assert_eq!(body["task"]["description"], "x");
    assert_eq!(body["task"]["status"], "TODO");
    assert_eq!(body["task"]["priority"], "HIGH");
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let created = create_task(&client, &base, json!({ "title": "t" })).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let resp = client
        .put(format!("{base}/api/tasks/{id}"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No fields to update");
}

#[tokio::test]
async fn general_update_does_not_validate_status() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let created = create_task(&client, &base, json!({ "title": "t" })).await;
    let id = created["task"]["id"].as_i64().unwrap();

    // PUT writes the status column as an opaque string; only the dedicated
    // /status route enforces the enum.
    let resp = client
        .put(format!("{base}/api/tasks/{id}"))
        .json(&json!({ "status": "BLOCKED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{base}/api/tasks/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["task"]["status"], "BLOCKED");
}

#[tokio::test]
async fn status_patch_enforces_the_enum() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let created = create_task(&client, &base, json!({ "title": "t" })).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let resp = client
        .patch(format!("{base}/api/tasks/{id}/status"))
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Invalid status. Must be TODO, IN_PROGRESS, or DONE"
    );

    let resp = client
        .patch(format!("{base}/api/tasks/{id}/status"))
        .json(&json!({ "status": "DONE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Task status updated successfully");
    assert_eq!(body["status"], "DONE");

    let body: Value = client
        .get(format!("{base}/api/tasks/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["task"]["status"], "DONE");
}

#[tokio::test]
async fn delete_then_delete_again_returns_404() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let created = create_task(&client, &base, json!({ "title": "t" })).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let first = client
        .delete(format!("{base}/api/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["message"], "Task deleted successfully");

    let second = client
        .delete(format!("{base}/api/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/api/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn root_serves_the_frontend_document() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    // cargo runs integration tests from the package root, where public/ lives.
    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = resp.text().await.unwrap();
    assert!(text.contains("Task Board"));
}
