use axum::{
    extract::{Request, State},
    http::{HeaderMap, Uri},
    middleware::Next,
    response::Response,
};

use crate::app_state::AppState;
use crate::i18n::SupportedLanguage;

/// Language detection middleware; the result is stored in request extensions
pub async fn language_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let language = detect_language(
        request.uri(),
        request.headers(),
        state.localizer.default_language(),
    );
    request.extensions_mut().insert(language);

    next.run(request).await
}

/// Priority: `lang` query parameter, `X-Language` header, `Accept-Language`.
fn detect_language(uri: &Uri, headers: &HeaderMap, fallback: SupportedLanguage) -> SupportedLanguage {
    let from_query = uri.query().and_then(|query| {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "lang")
            .and_then(|(_, value)| value.parse::<SupportedLanguage>().ok())
    });
    if let Some(language) = from_query {
        return language;
    }

    if let Some(language) = headers
        .get("X-Language")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<SupportedLanguage>().ok())
    {
        return language;
    }

    headers
        .get("Accept-Language")
        .and_then(|v| v.to_str().ok())
        .map(|v| SupportedLanguage::from_accept_language(v, fallback))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_parameter_wins_over_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("Accept-Language", HeaderValue::from_static("en-US"));
        let uri: Uri = "/booking/start?lang=tr".parse().unwrap();
        assert_eq!(
            detect_language(&uri, &headers, SupportedLanguage::English),
            SupportedLanguage::Turkish
        );
    }

    #[test]
    fn falls_back_without_hints() {
        let uri: Uri = "/admin".parse().unwrap();
        assert_eq!(
            detect_language(&uri, &HeaderMap::new(), SupportedLanguage::Turkish),
            SupportedLanguage::Turkish
        );
    }
}
