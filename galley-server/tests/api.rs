//! HTTP surface tests driven through the router with oneshot requests

use axum::Router;
use axum::body::{Body, to_bytes};
use http::{Request, StatusCode, header};
use tempfile::TempDir;
use tower::ServiceExt;

use galley_server::api::build_app;
use galley_server::core::{Config, ServerState};
use galley_server::db::DbService;

async fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = DbService::new_memory().await.unwrap();
    let config = Config::with_overrides(dir.path().to_string_lossy().to_string(), 0);
    let state = ServerState::with_db(config, db.db);
    (build_app(state), dir)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn insert_request(expiry_date: &str) -> Request<Body> {
    let payload = serde_json::json!({
        "product_code": "P-001",
        "name": "Orange juice",
        "lot_name": "L-1",
        "expiry_date": expiry_date,
        "quantity": 12
    });
    Request::builder()
        .method("POST")
        .uri("/productos/insertar")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn insert_then_verify_over_http() {
    let (app, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(insert_request("2099-01-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap();
    let uuid = id.strip_prefix("product:").unwrap();

    let response = app
        .oneshot(
            Request::get(format!("/productos/verificar?uuid={}", uuid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = body_json(response).await;
    assert_eq!(outcome["status"], "VALID");
    assert_eq!(outcome["product_name"], "Orange juice");
    assert!(outcome["days_left"].as_i64().unwrap() > 0);
    assert!(outcome.get("days_overdue").is_none());
}

#[tokio::test]
async fn insert_with_malformed_expiry_date_reports_expiry_code() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(insert_request("not-a-date"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], 6003);
    assert!(json["message"].as_str().unwrap().contains("expiry_date"));
}

#[tokio::test]
async fn insert_with_missing_expiry_date_reports_expiry_code() {
    let (app, _dir) = test_app().await;

    let payload = serde_json::json!({
        "product_code": "P-001",
        "name": "Orange juice",
        "lot_name": "L-1",
        "quantity": 12
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/productos/insertar")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 6003);
}

#[tokio::test]
async fn verify_requires_a_reference() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::get("/productos/verificar")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("uuid"));
}

#[tokio::test]
async fn get_unknown_product_is_not_found() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::get("/productos/doesnotexist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], 6001);
}

#[tokio::test]
async fn consume_over_http_reports_refusal() {
    let (app, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(insert_request("2020-01-01"))
        .await
        .unwrap();
    let created = body_json(response).await;
    let uuid = created["id"]
        .as_str()
        .unwrap()
        .strip_prefix("product:")
        .unwrap()
        .to_string();

    let response = app
        .oneshot(
            Request::post(format!("/productos/salida/{}", uuid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = body_json(response).await;
    assert_eq!(outcome["status"], "EXPIRED");
    assert!(outcome.get("sale_uuid").is_none());
}
