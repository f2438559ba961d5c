// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

const DEFAULT_LANG: &str = "en";

// Catalogs are bundled with the binary, keyed by error code
const CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("ro", include_str!("../../locales/ro.json")),
];

static SHARED: LazyLock<I18nStore> = LazyLock::new(|| {
    I18nStore::load().unwrap_or_else(|e| {
        tracing::error!("Failed to load message catalogs: {}", e);
        I18nStore::default()
    })
});

#[derive(Debug, Default, Clone)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        for (lang, raw) in CATALOGS {
            let catalog: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("catalog '{}' is invalid: {}", lang, e))?;
            messages.insert(lang.to_string(), catalog);
        }
        Ok(Self { messages })
    }

    pub fn shared() -> &'static I18nStore {
        &SHARED
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.messages.contains_key(lang)
    }

    /// Message for `key` in `lang`, falling back to English and then to the key itself.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|c| c.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
