// src/models/token.rs
//
// Wire format of the pickup authorization token carried inside the QR code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Token as produced by the issuer. Every field is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationToken {
    pub case_id: String,
    pub company_id: String,
    pub deceased_name: String,
    pub date: String,
    pub permits: Vec<String>,
    pub issued_at: DateTime<Utc>,
}

impl AuthorizationToken {
    /// Compact JSON text, ready to be put in a QR code or pasted by hand.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Token as read back by a validator.
///
/// Only `caseId` and `companyId` decide whether the payload is usable; the
/// descriptive fields are shown to the operator and never trusted. Unknown
/// keys are ignored so newer issuers can add fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenPayload {
    pub case_id: Option<String>,
    pub company_id: Option<String>,
    pub deceased_name: Option<String>,
    pub date: Option<String>,
    pub permits: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    // First dashboard builds wrote `timestamp`; only read when `issuedAt` is absent
    #[serde(rename = "timestamp", skip_serializing)]
    legacy_timestamp: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadDefect {
    #[error("payload is not valid JSON: {0}")]
    NotJson(String),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload has unexpected field types: {0}")]
    BadShape(String),
    #[error("payload is missing `{0}`")]
    MissingField(&'static str),
}

impl TokenPayload {
    /// Parses raw scanner or keyboard text.
    ///
    /// Camera and manual entry both come through here; there is no lenient path.
    pub fn parse(raw: &str) -> Result<Self, PayloadDefect> {
        let value: Value =
            serde_json::from_str(raw.trim()).map_err(|e| PayloadDefect::NotJson(e.to_string()))?;

        if !value.is_object() {
            return Err(PayloadDefect::NotAnObject);
        }

        let mut payload: TokenPayload =
            serde_json::from_value(value).map_err(|e| PayloadDefect::BadShape(e.to_string()))?;

        if let Some(legacy) = payload.legacy_timestamp.take() {
            if payload.issued_at.is_none() {
                payload.issued_at = serde_json::from_value(legacy)
                    .map_err(|e| PayloadDefect::BadShape(format!("timestamp: {e}")))?;
            }
        }

        if payload.case_id().is_none() {
            return Err(PayloadDefect::MissingField("caseId"));
        }
        if payload.company_id().is_none() {
            return Err(PayloadDefect::MissingField("companyId"));
        }

        Ok(payload)
    }

    /// Best-effort extraction of the identifiers from a payload that failed
    /// `parse`, so a malformed decision can still be filed under its case.
    pub fn salvage_ids(raw: &str) -> (Option<String>, Option<String>) {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) else {
            return (None, None);
        };
        let pick = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        (pick("caseId"), pick("companyId"))
    }

    pub fn case_id(&self) -> Option<&str> {
        non_blank(self.case_id.as_deref())
    }

    pub fn company_id(&self) -> Option<&str> {
        non_blank(self.company_id.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl From<AuthorizationToken> for TokenPayload {
    fn from(token: AuthorizationToken) -> Self {
        Self {
            case_id: Some(token.case_id),
            company_id: Some(token.company_id),
            deceased_name: Some(token.deceased_name),
            date: Some(token.date),
            permits: token.permits,
            issued_at: Some(token.issued_at),
            legacy_timestamp: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_reads_back() {
        let token = AuthorizationToken {
            case_id: "CASE-1".into(),
            company_id: "CO-1".into(),
            deceased_name: "Ion Popescu".into(),
            date: "2024-02-13".into(),
            permits: vec!["PRM-1".into(), "PRM-2".into()],
            issued_at: Utc::now(),
        };
        let text = token.encode().unwrap();
        assert!(text.contains("\"caseId\":\"CASE-1\""));
        assert!(text.contains("\"issuedAt\""));

        let parsed = TokenPayload::parse(&text).unwrap();
        assert_eq!(parsed, TokenPayload::from(token));
    }

    #[test]
    fn unknown_keys_and_legacy_timestamp_are_accepted() {
        let raw = r#"{"caseId":"CASE-1","companyId":"CO-1","vehicle":"B-01-GRZ",
                      "timestamp":"2024-02-13T12:30:00.000Z"}"#;
        let parsed = TokenPayload::parse(raw).unwrap();
        assert_eq!(parsed.case_id(), Some("CASE-1"));
        assert!(parsed.issued_at.is_some());
        assert!(parsed.permits.is_empty());
    }

    #[test]
    fn issued_at_wins_over_legacy_timestamp() {
        let raw = r#"{"caseId":"CASE-1","companyId":"CO-1",
                      "issuedAt":"2024-02-13T12:30:00Z",
                      "timestamp":"2023-01-01T00:00:00Z"}"#;
        let parsed = TokenPayload::parse(raw).unwrap();
        assert_eq!(
            parsed.issued_at.map(|t| t.to_rfc3339()),
            Some("2024-02-13T12:30:00+00:00".to_string())
        );

        // Ignored entirely once issuedAt is there, even if unreadable
        let raw = r#"{"caseId":"CASE-1","companyId":"CO-1",
                      "issuedAt":"2024-02-13T12:30:00Z","timestamp":1707827400}"#;
        assert!(TokenPayload::parse(raw).is_ok());

        // Never echoed back under the legacy key
        let text = serde_json::to_string(&parsed).unwrap();
        assert!(!text.contains("timestamp"));
    }

    #[test]
    fn defects_are_classified() {
        assert!(matches!(TokenPayload::parse("{not json"), Err(PayloadDefect::NotJson(_))));
        assert_eq!(TokenPayload::parse("[1,2]"), Err(PayloadDefect::NotAnObject));
        assert_eq!(
            TokenPayload::parse(r#"{"companyId":"CO-1"}"#),
            Err(PayloadDefect::MissingField("caseId"))
        );
        assert_eq!(
            TokenPayload::parse(r#"{"caseId":"CASE-1","companyId":"   "}"#),
            Err(PayloadDefect::MissingField("companyId"))
        );
        assert!(matches!(
            TokenPayload::parse(r#"{"caseId":"CASE-1","companyId":"CO-1","permits":"PRM-1"}"#),
            Err(PayloadDefect::BadShape(_))
        ));
    }

    #[test]
    fn salvage_keeps_what_it_can() {
        assert_eq!(
            TokenPayload::salvage_ids(r#"{"caseId":"CASE-9"}"#),
            (Some("CASE-9".to_string()), None)
        );
        assert_eq!(TokenPayload::salvage_ids("{not json"), (None, None));
    }
}
