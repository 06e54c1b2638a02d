//! Prometheus metrics for the console and its Fineract calls.

use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    http::Method,
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use service_core::fineract::CallObserver;

pub struct ConsoleMetrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration: HistogramVec,
    fineract_calls_total: IntCounterVec,
    fineract_call_duration: HistogramVec,
}

impl ConsoleMetrics {
    fn register() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("console_http_requests_total", "Total number of HTTP requests"),
            &["method", "route", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "console_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "route"],
        )?;
        let fineract_calls_total = IntCounterVec::new(
            Opts::new("console_fineract_calls_total", "Total number of Fineract API calls"),
            &["method", "status"],
        )?;
        let fineract_call_duration = HistogramVec::new(
            HistogramOpts::new(
                "console_fineract_call_duration_seconds",
                "Fineract API call duration in seconds",
            )
            .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["method"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(fineract_calls_total.clone()))?;
        registry.register(Box::new(fineract_call_duration.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration,
            fineract_calls_total,
            fineract_call_duration,
        })
    }
}

static METRICS: Lazy<Result<ConsoleMetrics, prometheus::Error>> = Lazy::new(ConsoleMetrics::register);

fn metrics() -> Option<&'static ConsoleMetrics> {
    METRICS.as_ref().ok()
}

/// Register all collectors (forces lazy initialization).
pub fn init_metrics() -> Result<(), String> {
    match &*METRICS {
        Ok(_) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let Some(metrics) = metrics() else {
        return String::new();
    };
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Records request count and latency per matched route.
pub async fn http_metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    if let Some(metrics) = metrics() {
        let status = response.status().as_u16().to_string();
        metrics
            .http_requests_total
            .with_label_values(&[&method, &route, &status])
            .inc();
        metrics
            .http_request_duration
            .with_label_values(&[&method, &route])
            .observe(start.elapsed().as_secs_f64());
    }

    response
}

/// Feeds Fineract call outcomes into the registry.
pub struct FineractCallMetrics;

impl CallObserver for FineractCallMetrics {
    fn observe(&self, method: &Method, status: Option<u16>, elapsed: Duration) {
        let Some(metrics) = metrics() else {
            return;
        };
        let status = status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "transport_error".to_string());
        metrics
            .fineract_calls_total
            .with_label_values(&[method.as_str(), &status])
            .inc();
        metrics
            .fineract_call_duration
            .with_label_values(&[method.as_str()])
            .observe(elapsed.as_secs_f64());
    }
}
