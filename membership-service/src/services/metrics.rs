use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// HTTP metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Engine metrics
pub static MEMBERSHIP_QUERIES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static ROLE_CHANGES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Build the registry and publish the collectors. Calling it again is a no-op
/// for the globals that are already set.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;

    let request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )?;

    let membership_queries = IntCounterVec::new(
        Opts::new(
            "membership_queries_total",
            "Membership listings by outcome (ok, invalid, error)",
        ),
        &["outcome"],
    )?;

    let role_changes = IntCounterVec::new(
        Opts::new(
            "role_changes_total",
            "Role set transitions reported to the change sink",
        ),
        &["entity_type"],
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(request_duration.clone()))?;
    registry.register(Box::new(membership_queries.clone()))?;
    registry.register(Box::new(role_changes.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
    let _ = MEMBERSHIP_QUERIES_TOTAL.set(membership_queries);
    let _ = ROLE_CHANGES_TOTAL.set(role_changes);

    Ok(())
}

pub fn record_membership_query(outcome: &str) {
    if let Some(counter) = MEMBERSHIP_QUERIES_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_role_change(entity_type: &str) {
    if let Some(counter) = ROLE_CHANGES_TOTAL.get() {
        counter.with_label_values(&[entity_type]).inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_counters_are_exported() {
        init_metrics().unwrap();
        record_membership_query("ok");
        record_role_change("project");

        let body = get_metrics();
        assert!(body.contains("membership_queries_total"));
        assert!(body.contains("role_changes_total{entity_type=\"project\"}"));
    }
}
