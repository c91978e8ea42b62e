use axum::{
    extract::rejection::FormRejection,
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form,
};

use crate::error::{AppError, AppResult};
use crate::i18n::I18n;

/// Post/redirect/get answer for form submissions: a `303 See Other` to the
/// next page, carrying a one-shot `success` or `error` message in the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub location: String,
    pub param: &'static str,
    pub message: String,
}

impl Flash {
    pub fn success(location: impl Into<String>, message: String) -> Self {
        Self {
            location: location.into(),
            param: "success",
            message,
        }
    }

    /// Redirect with the localized form of `err`; the error itself is logged.
    pub fn failure(location: impl Into<String>, err: &AppError, i18n: &I18n) -> Self {
        err.log();
        Self {
            location: location.into(),
            param: "error",
            message: err.localized(i18n),
        }
    }

    pub fn target(&self) -> String {
        match serde_urlencoded::to_string(&[(self.param, self.message.as_str())]) {
            Ok(query) => {
                let separator = if self.location.contains('?') { '&' } else { '?' };
                format!("{}{}{}", self.location, separator, query)
            }
            Err(_) => self.location.clone(),
        }
    }
}

/// Body of a form post. A body that does not decode becomes a validation
/// error, so it is answered with a flash redirect like any other failure.
pub fn form_body<T>(form: Result<Form<T>, FormRejection>) -> AppResult<T> {
    form.map(|Form(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

impl IntoResponse for Flash {
    fn into_response(self) -> Response {
        match HeaderValue::from_str(&self.target()) {
            Ok(location) => (StatusCode::SEE_OTHER, [(LOCATION, location)]).into_response(),
            Err(_) => {
                tracing::error!(location = %self.location, "Invalid redirect target");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
