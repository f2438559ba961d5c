// src/models/company.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

// Maps the `authorization_status` enum in Postgres.
// The dashboard used traffic-light badges, so GREEN/RED are still accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "authorization_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    #[serde(alias = "GREEN")]
    Authorized,
    #[serde(alias = "RED")]
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    // Romanian fiscal code
    pub cui: String,
    pub location: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub status: AuthorizationStatus,
    #[serde(default)]
    pub processing_location: Option<String>,
}

impl Company {
    pub fn is_authorized(&self) -> bool {
        self.status == AuthorizationStatus::Authorized
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(
        length(min = 1, message = "required"),
        custom(function = "validate_company_id")
    )]
    pub id: String,
    #[validate(length(min = 2, message = "too_short"))]
    pub name: String,
    #[validate(length(min = 2, message = "too_short"))]
    pub cui: String,
    #[validate(length(min = 1, message = "required"))]
    pub location: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[validate(email(message = "invalid_email"))]
    pub email: String,
}

// Ids are printed into tokens and compared byte for byte at the checkpoint
fn validate_company_id(id: &str) -> Result<(), ValidationError> {
    if id.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("whitespace").with_message("no_whitespace".into()));
    }
    Ok(())
}

impl CreateCompanyPayload {
    /// New companies wait for an administrator before they can pick up anyone.
    pub fn into_company(self) -> Company {
        Company {
            id: self.id,
            name: self.name,
            cui: self.cui,
            location: self.location,
            address: self.address,
            phone: self.phone,
            email: self.email,
            status: AuthorizationStatus::Suspended,
            processing_location: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: AuthorizationStatus,
}
