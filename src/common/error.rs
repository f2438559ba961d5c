// src/common/error.rs

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::validation::RejectReason;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Malformed request: {detail}")]
    InvalidRequest { status: StatusCode, detail: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Missing capability '{0}'")]
    Forbidden(&'static str),

    #[error("Case is missing required field '{0}'")]
    InvalidCase(&'static str),

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    #[error("Company already exists: {0}")]
    CompanyAlreadyExists(String),

    #[error("Approval disabled, automatic check rejected the token ({0:?})")]
    ApprovalDisabled(Option<RejectReason>),

    #[error("Scanner is already running")]
    ScannerBusy,

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("No code scanned before the timeout")]
    ScanTimeout,

    #[error("QR rendering failed: {0}")]
    QrRender(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::InvalidRequest {
                        status: rejection.status(),
                        detail: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

impl_from_rejection!(JsonRejection, QueryRejection, PathRejection);

/// Error as it leaves the API: localized message plus a stable code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidRequest { .. } => "INVALID_REQUEST",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidCase(_) => "INVALID_CASE",
            AppError::CaseNotFound(_) => "CASE_NOT_FOUND",
            AppError::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            AppError::CompanyAlreadyExists(_) => "COMPANY_ALREADY_EXISTS",
            AppError::ApprovalDisabled(_) => "APPROVAL_DISABLED",
            AppError::ScannerBusy => "SCANNER_BUSY",
            AppError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            AppError::ScanTimeout => "SCAN_TIMEOUT",
            AppError::QrRender(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest { status, .. } => *status,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::UserNotFound => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidCase(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CaseNotFound(_) | AppError::CompanyNotFound(_) => StatusCode::NOT_FOUND,
            AppError::CompanyAlreadyExists(_)
            | AppError::ApprovalDisabled(_)
            | AppError::ScannerBusy => StatusCode::CONFLICT,
            AppError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ScanTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::QrRender(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::InvalidRequest { detail, .. } => Some(json!({ "reason": detail })),
            AppError::Forbidden(capability) => Some(json!({ "capability": capability })),
            AppError::InvalidCase(field) => Some(json!({ "field": field })),
            AppError::CaseNotFound(id) | AppError::CompanyNotFound(id) => Some(json!({ "id": id })),
            AppError::CompanyAlreadyExists(key) => Some(json!({ "key": key })),
            AppError::ApprovalDisabled(reason) => Some(json!({ "reason": reason })),
            AppError::DeviceUnavailable(detail) => Some(json!({ "device": detail })),
            _ => None,
        }
    }

    /// Converts into the response shape, translating the message for `locale`.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        if status.is_server_error() && !matches!(self, AppError::DeviceUnavailable(_)) {
            // Detailed message stays in the logs only
            tracing::error!("Internal server error: {:?}", self);
        }

        ApiError {
            status,
            code: self.code(),
            error: store.translate(&locale.0, self.code()),
            details: self.details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

// Used by extractors, which have no locale at hand
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::shared())
            .into_response()
    }
}
