//! Service middleware and metric records.
//!
//! ## Metrics Exposed
//!
//! Emitted as structured `tracing` events under the `molfp::metrics` target:
//!
//! - `request`: path, method, status, latency
//! - `fingerprint`: algorithm, output kind, molecule count, cache hits, latency
//! - `mhfp`: molecule count, signature length, latency

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Records request count and latency per path.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    info!(
        target: "molfp::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record a fingerprint generation.
pub fn record_fingerprint_metrics(algorithm: &str, kind: &str, molecules: usize, cache_hits: usize, latency_ms: u64) {
    info!(
        target: "molfp::metrics",
        metric_type = "fingerprint",
        algorithm = algorithm,
        kind = kind,
        molecules = molecules,
        cache_hits = cache_hits,
        latency_ms = latency_ms,
        "fingerprint_metric"
    );
}

/// Record a MinHash encoding.
pub fn record_mhfp_metrics(molecules: usize, permutations: usize, latency_ms: u64) {
    info!(
        target: "molfp::metrics",
        metric_type = "mhfp",
        molecules = molecules,
        permutations = permutations,
        latency_ms = latency_ms,
        "mhfp_metric"
    );
}
