// src/app.rs

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::{config::AppState, handlers};

pub fn build_router(app_state: AppState) -> Router {
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let user_routes = Router::new().route("/me", get(handlers::auth::get_me));

    let company_routes = Router::new()
        .route(
            "/",
            get(handlers::companies::list_companies).post(handlers::companies::create_company),
        )
        .route("/me", get(handlers::companies::get_my_company))
        .route("/{id}/status", put(handlers::companies::update_company_status));

    let case_routes = Router::new()
        .route("/", get(handlers::cases::list_my_cases))
        .route("/{id}/token", post(handlers::cases::issue_token))
        .route("/{id}/qr", get(handlers::cases::issue_qr));

    let validation_routes = Router::new()
        .route(
            "/",
            post(handlers::validations::decide).get(handlers::validations::list_history),
        )
        .route("/check", post(handlers::validations::check_token))
        .route("/scan", post(handlers::validations::scan_token));

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/companies", company_routes)
        .nest("/api/cases", case_routes)
        .nest("/api/validations", validation_routes)
        .with_state(app_state)
}

async fn health(State(app_state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "backend": app_state.backend }))
}
