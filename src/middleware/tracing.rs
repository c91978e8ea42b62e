use axum::{
    extract::{MatchedPath, Request},
    http::{header::LOCATION, StatusCode},
    middleware::Next,
    response::Response,
};
use opentelemetry::{
    trace::{Span, SpanKind, Status, Tracer},
    KeyValue,
};
use std::time::Instant;
use tracing::{info_span, Instrument};

use crate::telemetry;

/// Which surface of the application a route belongs to.
fn area(route: &str) -> &'static str {
    match route.split('/').nth(1) {
        Some("admin") => "admin",
        Some("booking") => "booking",
        Some("api") => "api",
        _ => "system",
    }
}

/// Outcome of a form post, read from the flash redirect it answered with.
fn form_outcome(response: &Response) -> Option<&'static str> {
    if response.status() != StatusCode::SEE_OTHER {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let query = location.split_once('?').map(|(_, q)| q).unwrap_or_default();
    if query.split('&').any(|pair| pair.starts_with("error=")) {
        Some("rejected")
    } else {
        Some("accepted")
    }
}

/// Per-request server span, log span and request metrics.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let area = area(&route);
    let started = Instant::now();

    let tracer = telemetry::get_tracer("training-center-http");
    let mut span = tracer
        .span_builder(format!("{} {}", method, route))
        .with_kind(SpanKind::Server)
        .start(&tracer);
    span.set_attribute(KeyValue::new("http.method", method.clone()));
    span.set_attribute(KeyValue::new("http.route", route.clone()));
    span.set_attribute(KeyValue::new("app.area", area));

    let log_span = info_span!(
        "http_request",
        method = %method,
        uri = %request.uri(),
        area,
        request_id = %uuid::Uuid::now_v7(),
    );
    let response = next.run(request).instrument(log_span).await;

    let elapsed = started.elapsed();
    let status = response.status();
    span.set_attribute(KeyValue::new("http.status_code", i64::from(status.as_u16())));
    span.set_status(if status.is_server_error() {
        Status::error(format!("HTTP {}", status.as_u16()))
    } else {
        Status::Ok
    });
    span.end();

    let labels = [
        KeyValue::new("method", method),
        KeyValue::new("route", route),
        KeyValue::new("status_code", status.as_u16().to_string()),
    ];
    telemetry::record_counter("http_requests_total", 1, &labels);
    telemetry::record_histogram("http_request_duration_seconds", elapsed.as_secs_f64(), &labels);
    if let Some(outcome) = form_outcome(&response) {
        telemetry::record_counter(
            "form_submissions_total",
            1,
            &[KeyValue::new("area", area), KeyValue::new("outcome", outcome)],
        );
    }

    response
}
