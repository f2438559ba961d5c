// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::I18nStore;

// Language the API answers in, taken from Accept-Language
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale("en".to_string())
    }
}

impl Locale {
    /// First language in the header we have a catalog for.
    pub fn from_header(header_str: &str, store: &I18nStore) -> Option<Self> {
        accept_language::parse(header_str)
            .iter()
            // "ro-RO" -> "ro"
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .find(|lang| store.supports(lang))
            .map(Locale)
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(|header_str| Locale::from_header(header_str, I18nStore::shared()))
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        let store = I18nStore::shared();
        let locale = Locale::from_header("de-DE,ro-RO;q=0.8,en;q=0.5", store).unwrap();
        assert_eq!(locale.0, "ro");
        assert!(Locale::from_header("de-DE", store).is_none());
    }
}
