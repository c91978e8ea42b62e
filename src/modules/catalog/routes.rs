use axum::{routing::get, Router};

use super::handlers::{campuses, courses, languages, sessions};
use crate::app_state::AppState;

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(courses))
        .route("/campuses", get(campuses))
        .route("/sessions", get(sessions))
        .route("/languages", get(languages))
}
