// src/models/validation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::{case::Case, company::Company, crew::Crew, token::TokenPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "validation_outcome", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reject_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    MalformedPayload,
    UnknownCompany,
    UnknownCase,
    CaseCompanyMismatch,
    CompanySuspended,
    OperatorRejected,
}

/// Result of running a presented payload through the validator.
///
/// Nothing here is persisted; the operator still has to act on it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub outcome: Outcome,
    pub reason: Option<RejectReason>,
    // Raw text as presented, so the operator can submit the decision for it
    pub payload: String,
    pub token: Option<TokenPayload>,
    pub company: Option<Company>,
    pub case: Option<Case>,
    // Company's employee and vehicle on file, once the company is known
    pub crew: Option<Crew>,
    pub checked_at: DateTime<Utc>,
}

impl Verdict {
    /// The approve button is only live when the automatic check approved.
    pub fn approve_enabled(&self) -> bool {
        self.outcome == Outcome::Approved
    }

    pub fn case_id(&self) -> Option<String> {
        self.token
            .as_ref()
            .and_then(|t| t.case_id())
            .map(str::to_owned)
            .or_else(|| TokenPayload::salvage_ids(&self.payload).0)
    }

    pub fn company_id(&self) -> Option<String> {
        self.token
            .as_ref()
            .and_then(|t| t.company_id())
            .map(str::to_owned)
            .or_else(|| TokenPayload::salvage_ids(&self.payload).1)
    }
}

// What the operator pressed in the validation modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorAction {
    Approve,
    Reject,
}

/// One immutable row of the decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ValidationDecision {
    pub id: Uuid,
    pub case_id: Option<String>,
    pub company_id: Option<String>,
    pub decided_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub reason: Option<RejectReason>,
    // Email of the validator who pressed the button
    pub decided_by: String,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckPayload {
    #[validate(length(min = 1, message = "required"))]
    pub payload: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecidePayload {
    #[validate(length(min = 1, message = "required"))]
    pub payload: String,
    pub action: OperatorAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub case_id: Option<String>,
    pub limit: Option<usize>,
}

// Verdict plus the UI switch, as served to the validation modal
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictResponse {
    #[serde(flatten)]
    pub verdict: Verdict,
    pub approve_enabled: bool,
}

impl From<Verdict> for VerdictResponse {
    fn from(verdict: Verdict) -> Self {
        let approve_enabled = verdict.approve_enabled();
        Self { verdict, approve_enabled }
    }
}
