// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{Capability, User},
};

/// A capability a route demands, as a type.
pub trait CapabilityDef: Send + Sync + 'static {
    fn capability() -> Capability;
}

/// Guard extractor: authenticates, then checks the role grants `T`.
pub struct RequireCapability<T>(pub User, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireCapability<T>
where
    T: CapabilityDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        let required = T::capability();
        if !user.role.can(required) {
            tracing::warn!("{} denied '{}'", user.email, required.slug());
            return Err(AppError::Forbidden(required.slug()).to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireCapability(user, PhantomData))
    }
}

// ---
// Capabilities (types)
// ---

pub struct CapManageCompanies;
impl CapabilityDef for CapManageCompanies {
    fn capability() -> Capability { Capability::ManageCompanies }
}

pub struct CapIssueTokens;
impl CapabilityDef for CapIssueTokens {
    fn capability() -> Capability { Capability::IssueTokens }
}

pub struct CapValidatePickups;
impl CapabilityDef for CapValidatePickups {
    fn capability() -> Capability { Capability::ValidatePickups }
}

pub struct CapViewValidationHistory;
impl CapabilityDef for CapViewValidationHistory {
    fn capability() -> Capability { Capability::ViewValidationHistory }
}
