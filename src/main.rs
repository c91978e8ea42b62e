use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::info;

use training_center::{
    app::create_router,
    app_state::AppState,
    config,
    db::{self, PgStore},
    i18n::init_i18n,
    telemetry::{init_telemetry, TelemetryConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = config::init()?.clone();

    let telemetry = init_telemetry(Some(TelemetryConfig::for_app(&config.app)))?;

    let pool = db::init_pool(&config.database).await?;

    tokio::fs::create_dir_all(&config.app.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.app.upload_dir.display()))?;

    let localizer = init_i18n("locales", config.app.default_language)
        .context("Failed to load translations")?;

    let addr = config.server_addr();
    let app_name = config.app.name.clone();
    let state = AppState::new(Arc::new(PgStore::new(pool)), config, Arc::new(localizer));
    let app = create_router(state);

    info!("{} listening on {}", app_name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to serve application")?;

    telemetry.shutdown();
    Ok(())
}
