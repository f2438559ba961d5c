#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use groza::app::build_router;
use groza::config::{AppConfig, AppState};
use groza::services::scanner::NoDevice;
use std::sync::Arc;
use tower::ServiceExt;

pub const DEMO_PASSWORD: &str = "grozademo!";
pub const GLOBAL_ADMIN: &str = "global_admin@groza.ro";
pub const VALIDATOR: &str = "validator@spital-central.ro";
// Admin of CO-1 (authorized, holds CASE-2024-001 and CASE-2024-003)
pub const COMPANY_ADMIN: &str = "contact@funeralservices.ro";

pub fn app() -> Router {
    let state = AppState::in_memory(AppConfig::local("integration-secret"), Arc::new(NoDevice))
        .expect("state");
    build_router(state)
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("response")
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn login(app: &Router, email: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": DEMO_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login {email}");
    read_json(response).await["token"]
        .as_str()
        .expect("token")
        .to_string()
}
