use axum::{extract::FromRequestParts, http::request::Parts};
use fluent_bundle::FluentValue;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use crate::app_state::AppState;
use crate::i18n::{Localizer, SupportedLanguage};

/// Extractor for getting localized messages in handlers
#[derive(Clone)]
pub struct I18n {
    pub localizer: Arc<Localizer>,
    pub language: SupportedLanguage,
}

impl I18n {
    pub fn get(&self, key: &str) -> String {
        self.localizer
            .get_string_for_language(&self.language, key, None)
    }

    pub fn get_with_args(&self, key: &str, args: &HashMap<String, FluentValue>) -> String {
        self.localizer
            .get_string_for_language(&self.language, key, Some(args))
    }

    pub fn language(&self) -> SupportedLanguage {
        self.language
    }
}

impl FromRequestParts<AppState> for I18n {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by the language middleware
        let language = parts
            .extensions
            .get::<SupportedLanguage>()
            .copied()
            .unwrap_or_else(|| state.localizer.default_language());

        Ok(I18n {
            localizer: state.localizer.clone(),
            language,
        })
    }
}

/// Helper macro for creating FluentValue arguments easily
#[macro_export]
macro_rules! i18n_args {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut args = std::collections::HashMap::new();
        $(
            args.insert($key.to_string(), fluent_bundle::FluentValue::from($value));
        )*
        args
    }};
}
