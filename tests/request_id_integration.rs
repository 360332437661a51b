use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

fn build_app() -> Router {
    bg_relay::build_app(&bg_relay::AppConfig::default()).expect("build app")
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let app = build_app();
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("request /health");

    assert_eq!(resp.status(), StatusCode::OK);
    let request_id = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(request_id.starts_with("req_"), "x-request-id should be generated");
}

#[tokio::test]
async fn request_id_uses_client_value_when_valid() {
    let app = build_app();
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "client.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /health");

    let request_id = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert_eq!(request_id, "client.req-001");
}

#[tokio::test]
async fn invalid_client_value_is_replaced() {
    let app = build_app();
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "bad id with spaces")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /health");

    let request_id = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert_ne!(request_id, "bad id with spaces");
    assert!(request_id.starts_with("req_"));
}

#[tokio::test]
async fn error_body_contains_request_id() {
    let app = build_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/remini")
                .header("x-request-id", "err.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /api/remini");

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(v["requestId"], "err.req-001");
}
