use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::json;

use crate::{
    app_state::AppState,
    i18n::I18n,
    middleware::{language_middleware, observability_middleware},
    modules::{
        admin::routes::admin_routes, booking::routes::booking_routes,
        catalog::routes::catalog_routes,
    },
};

pub fn create_router(state: AppState) -> Router {
    let upload_max_bytes = state.env.app.upload_max_bytes;

    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/api", catalog_routes())
        .nest("/booking", booking_routes())
        .nest("/admin", admin_routes(upload_max_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), language_middleware))
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn hello(i18n: I18n) -> String {
    format!("{}\n", i18n.get("app-name"))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let (status, db_status) = match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let telemetry_health = crate::telemetry::telemetry_health_check();

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "services": {
                "database": db_status,
                "telemetry": telemetry_health
            }
        })),
    )
}
