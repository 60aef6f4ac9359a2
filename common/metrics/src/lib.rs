use std::time::Instant;

use axum::{
    body::Body, extract::MatchedPath, http::Request, middleware::Next, response::IntoResponse,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Shared by every histogram; sized for millisecond timings.
const BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0,
];

/// Install the global prometheus recorder.
///
/// # Errors
/// Fails if a global recorder is already installed.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets(BUCKETS)?
        .install_recorder()
}

/// Middleware recording request counts and latencies per matched route.
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    // Matched path keeps `/api/users/:id` as one series instead of one per id.
    let path = match req.extensions().get::<MatchedPath>() {
        Some(matched_path) => matched_path.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];

    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_ms", &labels)
        .record(start.elapsed().as_secs_f64() * 1000.0);

    response
}

pub fn inc(name: &'static str, labels: &[(String, String)], value: u64) {
    metrics::counter!(name, labels).increment(value);
}

pub fn histogram(name: &'static str, labels: &[(String, String)], value: f64) {
    metrics::histogram!(name, labels).record(value);
}

/// Records the milliseconds between creation and drop as a histogram entry.
pub struct TimingGuard<'a> {
    name: &'static str,
    labels: Vec<(String, String)>,
    borrowed: &'a [(String, String)],
    start: Instant,
}

pub fn timing_guard<'a>(name: &'static str, labels: &'a [(String, String)]) -> TimingGuard<'a> {
    TimingGuard {
        name,
        labels: Vec::new(),
        borrowed: labels,
        start: Instant::now(),
    }
}

impl TimingGuard<'_> {
    pub fn label(mut self, key: &str, value: &str) -> Self {
        if self.labels.is_empty() {
            self.labels = self.borrowed.to_vec();
        }
        self.labels.push((key.to_string(), value.to_string()));
        self
    }

    /// Drop the guard now, recording the elapsed time.
    pub fn fin(self) {}
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        let labels = if self.labels.is_empty() {
            self.borrowed
        } else {
            self.labels.as_slice()
        };
        histogram(self.name, labels, self.start.elapsed().as_millis() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        let labels = [("namespace".to_string(), "user".to_string())];
        inc("test_counter", &labels, 1);
        histogram("test_histogram", &labels, 12.5);
        timing_guard("test_timing", &labels).label("outcome", "ok").fin();
    }

    #[test]
    fn test_label_extends_borrowed_labels() {
        let labels = [("namespace".to_string(), "user".to_string())];
        let guard = timing_guard("test_timing", &labels).label("outcome", "ok");

        assert_eq!(
            guard.labels,
            vec![
                ("namespace".to_string(), "user".to_string()),
                ("outcome".to_string(), "ok".to_string()),
            ]
        );
    }
}
