// src/handlers/validations.rs

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
        extract::{AppJson, AppQuery},
        i18n::Locale,
        rbac::{CapValidatePickups, CapViewValidationHistory, RequireCapability},
    },
    models::validation::{
        CheckPayload, DecidePayload, HistoryQuery, ValidationDecision, VerdictResponse,
    },
};

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

// POST /api/validations/check
pub async fn check_token(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireCapability<CapValidatePickups>,
    AppJson(payload): AppJson<CheckPayload>,
) -> Result<Json<VerdictResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let verdict = app_state
        .validation_service
        .check(&payload.payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(verdict.into()))
}

// POST /api/validations/scan
pub async fn scan_token(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireCapability<CapValidatePickups>,
) -> Result<Json<VerdictResponse>, ApiError> {
    let verdict = app_state
        .validation_service
        .scan(&app_state.scanner, app_state.config.scan_timeout)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(verdict.into()))
}

// POST /api/validations
pub async fn decide(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireCapability(user, _): RequireCapability<CapValidatePickups>,
    AppJson(payload): AppJson<DecidePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let decision = app_state
        .validation_service
        .decide(&payload.payload, payload.action, &user.email)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(decision)))
}

// GET /api/validations?caseId=&limit=
pub async fn list_history(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireCapability<CapViewValidationHistory>,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> Result<Json<Vec<ValidationDecision>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let case_id = query.case_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let decisions = app_state
        .validation_service
        .history(case_id, limit)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(decisions))
}
