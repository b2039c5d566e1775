//! REST API behaviour through the axum router

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use toolmap::graph::CascadeDepth;
use toolmap::http::{router, AppState};
use toolmap::persistence::MemoryStorage;
use toolmap::{PersistenceManager, RankingBoard};

fn app() -> Router {
    let graph = PersistenceManager::with_storage(MemoryStorage::new(), CascadeDepth::Direct);
    let rankings = RankingBoard::with_storage(MemoryStorage::new());
    router(AppState::new(graph, rankings))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_status_endpoint() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["nodes"], 0);
    assert_eq!(body["storage"]["cascade"], "direct");
}

#[tokio::test]
async fn test_category_lifecycle() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/categories",
        Some(json!({ "id": "ides", "label": "IDEs" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "category");
    assert_eq!(body["connections"]["parent"], json!([{ "id": "root", "type": "primary" }]));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(json!({ "id": "cursor", "label": "Cursor", "parentCategory": "ides" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::GET, "/api/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": "ides", "label": "IDEs", "childCount": 1 }]));

    let (status, body) = send(&app, Method::DELETE, "/api/categories/ides", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "removed": ["cursor", "ides"] }));

    let (_, doc) = send(&app, Method::GET, "/api/nodes", None).await;
    assert_eq!(doc["totalNodes"], 1);
    assert_eq!(doc["categories"], json!([]));
    assert_eq!(doc["nodes"]["root"]["connections"]["children"], json!([]));
}

#[tokio::test]
async fn test_error_kinds_map_to_statuses() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/nodes/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    assert!(body["error"].as_str().unwrap().contains("ghost"));

    let (status, body) = send(&app, Method::POST, "/api/nodes", Some(json!({ "label": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid");

    send(&app, Method::POST, "/api/nodes", Some(json!({ "id": "a" }))).await;
    let (status, body) = send(&app, Method::POST, "/api/nodes", Some(json!({ "id": "a" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_unknown_payload_fields_are_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(json!({ "id": "a", "colour": "red" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid");

    let (status, _) = send(&app, Method::GET, "/api/nodes/a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_node_merges_fields() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(json!({ "id": "cursor", "label": "Cursor", "info": "AI editor" })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/nodes/cursor",
        Some(json!({ "id": "other", "url": "https://cursor.com", "info": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "cursor");
    assert_eq!(body["label"], "Cursor");
    assert_eq!(body["url"], "https://cursor.com");
    assert!(body.get("info").is_none());

    let (status, _) = send(&app, Method::PUT, "/api/nodes/ghost", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_connections_add_and_remove() {
    let app = app();
    send(&app, Method::POST, "/api/nodes", Some(json!({ "id": "a" }))).await;
    send(&app, Method::POST, "/api/nodes", Some(json!({ "id": "b" }))).await;

    let link = json!({ "source": "a", "target": "b" });
    let (status, body) = send(&app, Method::POST, "/api/connections", Some(link.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);
    let (_, body) = send(&app, Method::POST, "/api/connections", Some(link.clone())).await;
    assert_eq!(body["created"], false);

    let (_, node) = send(&app, Method::GET, "/api/nodes/a", None).await;
    assert_eq!(node["connections"]["secondary"], json!(["b"]));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/connections",
        Some(json!({ "source": "a", "target": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = send(&app, Method::DELETE, "/api/connections", Some(link.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);
    let (status, body) = send(&app, Method::DELETE, "/api/connections", Some(link)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/connections",
        Some(json!({ "source": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_is_merged() {
    let app = app();
    send(&app, Method::PUT, "/api/config", Some(json!({ "a": 1, "b": 2 }))).await;
    let (status, body) = send(&app, Method::PUT, "/api/config", Some(json!({ "b": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "a": 1, "b": 3 }));

    let (_, body) = send(&app, Method::GET, "/api/config", None).await;
    assert_eq!(body, json!({ "a": 1, "b": 3 }));
}

#[tokio::test]
async fn test_export_then_import() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/api/categories",
        Some(json!({ "id": "chat", "label": "Chat" })),
    )
    .await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/export")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .is_some());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let exported: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(exported["exportDate"].is_string());

    let fresh = self::app();
    let (status, body) = send(&fresh, Method::POST, "/api/import", Some(exported)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "totalNodes": 2 }));

    let (_, categories) = send(&fresh, Method::GET, "/api/categories", None).await;
    assert_eq!(categories[0]["id"], "chat");

    let (status, body) = send(&fresh, Method::POST, "/api/import", Some(json!({ "config": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid");
}

#[tokio::test]
async fn test_rankings_endpoints() {
    let app = app();
    for (name, score) in [("ana", 40), ("bo", 90)] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/rankings",
            Some(json!({ "playerName": name, "score": score, "totalQuestions": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::GET, "/api/rankings?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let rankings = body["rankings"].as_array().unwrap();
    assert_eq!(rankings.len(), 1);
    assert_eq!(rankings[0]["playerName"], "bo");

    let (status, _) = send(&app, Method::POST, "/api/rankings", Some(json!({ "score": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_storage_failure_is_500() {
    let storage = Arc::new(MemoryStorage::new());
    let graph = PersistenceManager::with_storage(Arc::clone(&storage), CascadeDepth::Direct);
    let app = router(AppState::new(graph, RankingBoard::with_storage(MemoryStorage::new())));
    storage.set_fail_writes(true);

    let (status, body) = send(&app, Method::POST, "/api/nodes", Some(json!({ "id": "a" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "storage_failure");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_creates_are_all_kept() {
    let app = app();
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = json!({ "id": format!("n{}", i) });
                send(&app, Method::POST, "/api/nodes", Some(body)).await.0
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let (_, doc) = send(&app, Method::GET, "/api/nodes", None).await;
    assert_eq!(doc["totalNodes"], 16);
}

#[tokio::test]
async fn test_root_cannot_be_deleted_as_category() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/api/categories",
        Some(json!({ "id": "ides", "label": "IDEs" })),
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, "/api/categories/root", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid");

    let (status, _) = send(&app, Method::GET, "/api/nodes/root", None).await;
    assert_eq!(status, StatusCode::OK);
}
