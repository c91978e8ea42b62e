use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::i18n::I18n;
use crate::i18n_args;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input, rejected before anything is written.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No available spots in session {0}")]
    Capacity(i64),

    /// The store failed mid-operation; the transaction was rolled back.
    #[error("Persistence error: {0}")]
    Persistence(#[source] DatabaseError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Unavailable(reason) => AppError::ServiceUnavailable(reason),
            other => AppError::Persistence(other),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join(", "))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Capacity(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Human-readable message for the end user, in the request language.
    /// Internal causes stay in the logs.
    pub fn localized(&self, i18n: &I18n) -> String {
        match self {
            AppError::Validation(details) => {
                i18n.get_with_args("error-validation", &i18n_args! { "details" => details.as_str() })
            }
            AppError::NotFound(details) => {
                i18n.get_with_args("error-not-found", &i18n_args! { "details" => details.as_str() })
            }
            AppError::Capacity(_) => i18n.get("error-capacity"),
            AppError::Persistence(_) => i18n.get("error-persistence"),
            AppError::ServiceUnavailable(_) => i18n.get("error-unavailable"),
            AppError::BadRequest(details) => {
                i18n.get_with_args("error-bad-request", &i18n_args! { "details" => details.as_str() })
            }
            AppError::InternalServerError(_) => i18n.get("error-internal"),
        }
    }

    pub(crate) fn log(&self) {
        match self {
            AppError::Persistence(_)
            | AppError::InternalServerError(_)
            | AppError::ServiceUnavailable(_) => tracing::error!(error = %self, "request failed"),
            _ => tracing::info!(error = %self, "request rejected"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let (kind, details) = match &self {
            AppError::Validation(d) => ("validation", d.clone()),
            AppError::NotFound(d) => ("not_found", d.clone()),
            AppError::Capacity(_) => ("capacity", self.to_string()),
            AppError::Persistence(_) => ("persistence", "The change could not be saved".to_string()),
            AppError::ServiceUnavailable(_) => ("unavailable", "Service unavailable".to_string()),
            AppError::BadRequest(d) => ("bad_request", d.clone()),
            AppError::InternalServerError(_) => {
                ("internal", "An internal server error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "kind": kind,
                "message": details,
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
