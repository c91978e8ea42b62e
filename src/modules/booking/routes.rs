use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{choose_campus, choose_session, confirm, show, start, success};
use crate::app_state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/success", get(success))
        .route("/{token}", get(show))
        .route("/{token}/campus", post(choose_campus))
        .route("/{token}/session", post(choose_session))
        .route("/{token}/confirm", post(confirm))
}
