// src/handlers/companies.rs

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        extract::{AppJson, AppPath},
        i18n::Locale,
        rbac::{CapIssueTokens, CapManageCompanies, RequireCapability},
    },
    models::{
        auth::{Capability, User},
        company::{Company, CreateCompanyPayload, UpdateStatusPayload},
    },
};

// GET /api/companies
pub async fn list_companies(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireCapability<CapManageCompanies>,
) -> Result<Json<Vec<Company>>, ApiError> {
    let companies = app_state
        .company_service
        .list()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(companies))
}

// POST /api/companies
pub async fn create_company(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireCapability<CapManageCompanies>,
    AppJson(payload): AppJson<CreateCompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let company = app_state
        .company_service
        .register(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(company)))
}

// PUT /api/companies/{id}/status
pub async fn update_company_status(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireCapability(admin, _): RequireCapability<CapManageCompanies>,
    AppPath(company_id): AppPath<String>,
    AppJson(payload): AppJson<UpdateStatusPayload>,
) -> Result<Json<Company>, ApiError> {
    tracing::info!(
        "{} sets company {} to {:?}",
        admin.email,
        company_id,
        payload.status
    );

    let company = app_state
        .company_service
        .set_status(&company_id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(company))
}

// GET /api/companies/me
pub async fn get_my_company(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireCapability(user, _): RequireCapability<CapIssueTokens>,
) -> Result<Json<Company>, ApiError> {
    let company_id = own_company(&user).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let company = app_state
        .company_service
        .get(company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(company))
}

/// Company a token-issuing user acts for.
pub(crate) fn own_company(user: &User) -> Result<&str, AppError> {
    user.role
        .company_id()
        .ok_or(AppError::Forbidden(Capability::IssueTokens.slug()))
}
