use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use super::documents::{delete_document, list_documents, upload_document};
use super::handlers::*;
use crate::app_state::AppState;

/// Room for the multipart framing and the small text fields around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn admin_routes(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course).post(update_course))
        .route("/courses/{id}/delete", post(delete_course))
        .route("/campuses", get(list_campuses).post(create_campus))
        .route("/campuses/{id}", get(get_campus).post(update_campus))
        .route("/campuses/{id}/delete", post(delete_campus))
        .route("/sessions", get(list_sessions).post(create_sessions))
        .route("/sessions/{id}", get(get_session).post(update_session))
        .route("/sessions/{id}/delete", post(delete_session))
        .route("/students", get(list_students))
        .route("/students/{id}", get(get_student))
        .route("/bookings/{id}/status", post(update_booking_status))
        .route("/bookings/{id}/remove", post(remove_booking))
        .route(
            "/documents",
            get(list_documents).post(upload_document).layer((
                DefaultBodyLimit::disable(),
                RequestBodyLimitLayer::new(upload_max_bytes + MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/documents/{id}/delete", post(delete_document))
}
