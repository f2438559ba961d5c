// src/services/issuer.rs

use chrono::Utc;
use image::{DynamicImage, ImageOutputFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::CaseRegistry,
    models::{case::Case, token::AuthorizationToken},
};

// Large enough for a phone camera at arm's length
const QR_MIN_SIZE: u32 = 256;

#[derive(Clone)]
pub struct TokenIssuer {
    cases: Arc<dyn CaseRegistry>,
}

impl TokenIssuer {
    pub fn new(cases: Arc<dyn CaseRegistry>) -> Self {
        Self { cases }
    }

    /// Builds the token for a case the caller already holds.
    ///
    /// Pure: the only input besides the arguments is the clock.
    pub fn issue_token(&self, case: &Case, company_id: &str) -> Result<AuthorizationToken, AppError> {
        let required = [
            ("caseId", case.id.as_str()),
            ("companyId", company_id),
            ("deceasedName", case.deceased_name.as_str()),
            ("date", case.date.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AppError::InvalidCase(*field));
        }

        Ok(AuthorizationToken {
            case_id: case.id.clone(),
            company_id: company_id.to_string(),
            deceased_name: case.deceased_name.clone(),
            date: case.date.clone(),
            permits: case.permits.clone(),
            issued_at: Utc::now(),
        })
    }

    /// Looks the case up and issues for it, on behalf of the company holding it.
    ///
    /// A case held by another company is reported as not found.
    pub async fn issue_for_case(
        &self,
        company_id: &str,
        case_id: &str,
    ) -> Result<AuthorizationToken, AppError> {
        let case = self
            .cases
            .get(case_id)
            .await?
            .filter(|case| case.company_id == company_id)
            .ok_or_else(|| AppError::CaseNotFound(case_id.to_string()))?;

        let token = self.issue_token(&case, company_id)?;
        tracing::info!("Token issued for case {} by company {}", case.id, company_id);
        Ok(token)
    }

    pub async fn cases_for(&self, company_id: &str) -> Result<Vec<Case>, AppError> {
        self.cases.list_for_company(company_id).await
    }
}

/// Renders text as a PNG QR code with high error correction.
pub fn render_qr_png(text: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)
        .map_err(|e| AppError::QrRender(e.to_string()))?;

    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| AppError::QrRender(e.to_string()))?;
    Ok(png)
}
