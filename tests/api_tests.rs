/// HTTP round-trip tests
/// Drives the router in-process against the in-memory backend
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use receipt_points_api::cache::MemoryBackend;
use receipt_points_api::config::{BackendKind, Config};
use receipt_points_api::db::StoreBackend;
use receipt_points_api::handlers::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Helper function to create test config
fn create_test_config(record_ttl: Duration) -> Config {
    Config {
        port: 8080,
        redis_addr: "localhost:6379".to_string(),
        store_backend: BackendKind::Memory,
        store_timeout: Duration::from_millis(500),
        record_ttl,
        max_store_retries: 3,
        request_timeout: Duration::from_secs(5),
    }
}

fn test_app(record_ttl: Duration) -> Router {
    let state = AppState::new(
        create_test_config(record_ttl),
        StoreBackend::Memory(MemoryBackend::default()),
    );
    router(Arc::new(state))
}

fn target_receipt() -> Value {
    json!({
        "retailer": "Target",
        "purchaseDate": "2022-01-01",
        "purchaseTime": "13:01",
        "items": [
            {"shortDescription": "Mountain Dew 12PK", "price": "6.49"},
            {"shortDescription": "Emils Cheese Pizza", "price": "12.25"},
            {"shortDescription": "Knorr Creamy Chicken", "price": "1.26"},
            {"shortDescription": "Doritos Nacho Cheese", "price": "3.35"},
            {"shortDescription": "   Klarbrunn 12-PK 12 FL OZ  ", "price": "12.00"}
        ],
        "total": "35.35"
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_receipt(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/receipts/process")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get_points(id: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/receipts/{}/points", id))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_process_then_get_points() {
    let app = test_app(Duration::from_secs(60));

    let (status, body) = send(&app, post_receipt(target_receipt().to_string())).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(uuid::Uuid::parse_str(&id).unwrap().get_version_num(), 4);

    let (status, body) = send(&app, get_points(&id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"points": 28}));
}

#[tokio::test]
async fn test_each_submission_gets_a_new_id() {
    let app = test_app(Duration::from_secs(60));

    let (_, first) = send(&app, post_receipt(target_receipt().to_string())).await;
    let (_, second) = send(&app, post_receipt(target_receipt().to_string())).await;

    assert_ne!(first["id"], second["id"]);
}

#[tokio::test]
async fn test_invalid_receipt_rejected() {
    let app = test_app(Duration::from_secs(60));
    let mut receipt = target_receipt();
    receipt["total"] = json!("36");

    let (status, body) = send(&app, post_receipt(receipt.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "The receipt is invalid"}));
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let app = test_app(Duration::from_secs(60));

    let (status, body) = send(&app, post_receipt("{\"retailer\": ".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "The receipt is invalid"}));

    // Missing total
    let (status, _) = send(
        &app,
        post_receipt(
            json!({"retailer": "Target", "purchaseDate": "2022-01-01", "purchaseTime": "13:01"})
                .to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_id_not_found() {
    let app = test_app(Duration::from_secs(60));

    let (status, body) = send(&app, get_points(&uuid::Uuid::new_v4().to_string())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No receipt found for that id"}));
}

#[tokio::test]
async fn test_non_v4_id_not_found() {
    let app = test_app(Duration::from_secs(60));

    let (status, _) = send(&app, get_points("c232ab00-9414-11ec-b3c8-9f6bdeced846")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get_points("not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_points_expire_after_ttl() {
    let app = test_app(Duration::from_millis(100));

    let (_, body) = send(&app, post_receipt(target_receipt().to_string())).await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, get_points(&id)).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, _) = send(&app, get_points(&id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_store() {
    let app = test_app(Duration::from_secs(60));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}
