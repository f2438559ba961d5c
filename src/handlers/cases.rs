// src/handlers/cases.rs

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::companies::own_company,
    middleware::{
        extract::AppPath,
        i18n::Locale,
        rbac::{CapIssueTokens, RequireCapability},
    },
    models::{auth::User, case::Case, token::AuthorizationToken},
    services::issuer::render_qr_png,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: AuthorizationToken,
    // Exact text to put in the QR code or paste at the checkpoint
    pub payload: String,
}

// GET /api/cases
pub async fn list_my_cases(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireCapability(user, _): RequireCapability<CapIssueTokens>,
) -> Result<Json<Vec<Case>>, ApiError> {
    let company_id = own_company(&user).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let cases = app_state
        .issuer
        .cases_for(company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(cases))
}

// POST /api/cases/{id}/token
pub async fn issue_token(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireCapability(user, _): RequireCapability<CapIssueTokens>,
    AppPath(case_id): AppPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = issue(&app_state, &user, &case_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(issued)))
}

// GET /api/cases/{id}/qr
pub async fn issue_qr(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireCapability(user, _): RequireCapability<CapIssueTokens>,
    AppPath(case_id): AppPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = issue(&app_state, &user, &case_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let png = render_qr_png(&issued.payload)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

async fn issue(
    app_state: &AppState,
    user: &User,
    case_id: &str,
) -> Result<IssuedToken, AppError> {
    let company_id = own_company(user)?;
    let token = app_state.issuer.issue_for_case(company_id, case_id).await?;
    let payload = token.encode().map_err(anyhow::Error::from)?;
    Ok(IssuedToken { token, payload })
}
