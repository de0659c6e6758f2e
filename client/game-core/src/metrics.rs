use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // Remote API Metrics
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "api_requests_total",
        "Total number of remote API calls",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "api_request_duration_seconds",
        "Remote API call duration in seconds",
        &["operation"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Game Metrics
    pub static ref GAME_SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "game_sessions_total",
        "Total number of game sessions by lifecycle event",
        &["module", "status"]
    )
    .unwrap();

    pub static ref GAME_SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "game_sessions_active",
        "Number of game sessions currently being played"
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_submitted_total",
        "Total number of answers submitted",
        &["module", "correct"]
    )
    .unwrap();

    // Progress Metrics
    pub static ref PROGRESS_COMMITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "progress_commits_total",
        "Total number of progress commits by outcome",
        &["outcome"]
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

/// Helper: track a remote API call with metrics
pub async fn track_api_call<F, T, E>(operation: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    API_REQUESTS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

/// Record a session lifecycle event (`started`, `finished`, `cancelled`)
pub fn record_session(module: &str, status: &str) {
    GAME_SESSIONS_TOTAL.with_label_values(&[module, status]).inc();
    match status {
        "started" => GAME_SESSIONS_ACTIVE.inc(),
        "finished" | "cancelled" => GAME_SESSIONS_ACTIVE.dec(),
        _ => {}
    }
}

pub fn record_answer(module: &str, correct: bool) {
    let correct = if correct { "true" } else { "false" };
    ANSWERS_SUBMITTED_TOTAL
        .with_label_values(&[module, correct])
        .inc();
}

pub fn record_commit(outcome: &str) {
    PROGRESS_COMMITS_TOTAL.with_label_values(&[outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Just verify that all metrics are properly registered
        let _ = API_REQUESTS_TOTAL
            .with_label_values(&["add_coins", "success"])
            .get();
        let _ = PROGRESS_COMMITS_TOTAL.with_label_values(&["committed"]).get();
    }

    #[test]
    fn test_render_metrics() {
        record_answer("coin_recognition", true);

        let result = render_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("answers_submitted_total"));
    }

    #[tokio::test]
    async fn test_track_api_call_counts_errors() {
        let before = API_REQUESTS_TOTAL
            .with_label_values(&["metrics_test", "error"])
            .get();

        let result: Result<(), &str> = track_api_call("metrics_test", async { Err("boom") }).await;

        assert!(result.is_err());
        assert_eq!(
            API_REQUESTS_TOTAL
                .with_label_values(&["metrics_test", "error"])
                .get(),
            before + 1
        );
    }
}
