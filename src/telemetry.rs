use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, Resource};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::AppConfig;

static OTLP_EXPORT_ENABLED: OnceCell<bool> = OnceCell::new();

/// Telemetry configuration structure
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub otlp_endpoint: Option<String>,
    pub enable_tracing: bool,
    pub export_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: std::env::var("APP_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            enable_tracing: std::env::var("OTEL_TRACES_ENABLED")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
            export_timeout: Duration::from_secs(30),
        }
    }
}

impl TelemetryConfig {
    /// Name the service after the application and tag its deployment environment.
    pub fn for_app(app: &AppConfig) -> Self {
        Self {
            service_name: app.name.to_lowercase().replace(' ', "-"),
            environment: format!("{:?}", app.environment).to_lowercase(),
            ..Self::default()
        }
    }
}

/// Telemetry handles for graceful shutdown
pub struct TelemetryHandles {
    _config: TelemetryConfig,
}

impl TelemetryHandles {
    pub fn shutdown(self) {
        info!("Shutting down telemetry providers...");
        global::shutdown_tracer_provider();
    }
}

/// Install the log subscriber and, when an endpoint is configured, the
/// OTLP trace exporter.
pub fn init_telemetry(config: Option<TelemetryConfig>) -> Result<TelemetryHandles> {
    let config = config.unwrap_or_default();

    setup_tracing_subscriber()?;

    info!(
        "Initializing telemetry for service: {} v{} in environment: {}",
        config.service_name, config.service_version, config.environment
    );

    let otlp_enabled = config.enable_tracing && config.otlp_endpoint.is_some();
    if otlp_enabled {
        init_tracing(&config)?;
    } else {
        info!("No OTLP endpoint configured, using console-only tracing");
    }
    let _ = OTLP_EXPORT_ENABLED.set(otlp_enabled);

    Ok(TelemetryHandles { _config: config })
}

fn create_resource(config: &TelemetryConfig) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ])
}

fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let Some(endpoint) = &config.otlp_endpoint else {
        return Ok(());
    };

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint)
                .with_timeout(config.export_timeout),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::config()
                .with_resource(create_resource(config))
                .with_sampler(opentelemetry_sdk::trace::Sampler::AlwaysOn),
        )
        .install_batch(runtime::Tokio)
        .context("Failed to initialize OTLP tracer")?;

    info!("Distributed tracing initialized with OTLP exporter at {}", endpoint);
    Ok(())
}

fn setup_tracing_subscriber() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}=debug,tower_http=info", env!("CARGO_CRATE_NAME")).into());

    Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// Get a tracer instance for the current service
pub fn get_tracer(name: &'static str) -> global::BoxedTracer {
    global::tracer(name)
}

/// Record a counter sample. Samples are emitted as structured events on the
/// `metrics` target so any log pipeline can aggregate them.
pub fn record_counter(name: &'static str, value: u64, labels: &[KeyValue]) {
    tracing::debug!(
        target: "metrics",
        counter = name,
        value,
        labels = ?labels,
        "counter incremented"
    );
}

/// Record a histogram sample on the `metrics` target.
pub fn record_histogram(name: &'static str, value: f64, labels: &[KeyValue]) {
    tracing::debug!(
        target: "metrics",
        histogram = name,
        value,
        labels = ?labels,
        "histogram recorded"
    );
}

/// Health check for telemetry components
pub fn telemetry_health_check() -> HashMap<String, bool> {
    let mut health = HashMap::new();
    health.insert("log_subscriber".to_string(), true);
    health.insert(
        "otlp_exporter".to_string(),
        OTLP_EXPORT_ENABLED.get().copied().unwrap_or(false),
    );
    health
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn service_is_named_after_the_app() {
        let config = TelemetryConfig::for_app(&Config::new("postgres://localhost/tc").app);
        assert_eq!(config.service_name, "training-center");
        assert_eq!(config.environment, "development");
        assert_eq!(config.service_version, env!("CARGO_PKG_VERSION"));
    }
}
