use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{EngineError, EngineResult};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Mission API Metrics
    pub static ref REMOTE_API_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "remote_api_requests_total",
        "Total number of mission API requests",
        &["endpoint", "status"]
    )
    .unwrap();

    pub static ref REMOTE_API_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "remote_api_request_duration_seconds",
        "Mission API request duration in seconds",
        &["endpoint"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // Quiz Metrics
    pub static ref QUIZ_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_runs_total",
        "Total number of quiz runs by lifecycle step",
        &["status"]
    )
    .unwrap();

    pub static ref QUIZ_RUNS_ACTIVE: IntGauge = register_int_gauge!(
        "quiz_runs_active",
        "Number of quiz runs currently held in memory"
    )
    .unwrap();

    pub static ref ANSWERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_total",
        "Total number of decided questions",
        &["cause", "correct"]
    )
    .unwrap();

    pub static ref DISPATCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dispatch_total",
        "Total number of answer submissions to the mission API",
        &["status"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track a mission API call with metrics
pub async fn track_remote_call<F, T>(endpoint: &str, future: F) -> EngineResult<T>
where
    F: std::future::Future<Output = EngineResult<T>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = match &result {
        Ok(_) => "success",
        Err(EngineError::NotFound { .. }) => "not_found",
        Err(_) => "error",
    };

    REMOTE_API_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status])
        .inc();

    REMOTE_API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(duration);

    result
}
