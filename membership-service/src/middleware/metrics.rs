use crate::services::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use service_core::axum::{extract::Request, middleware::Next, response::Response};
use service_core::middleware::PLAYGROUND_PATH;
use std::time::Instant;

const KNOWN_ROUTES: [&str; 4] = ["/graphql", "/health", "/metrics", PLAYGROUND_PATH];

/// Unknown paths share one label so scanners cannot blow up cardinality.
fn route_label(path: &str) -> &'static str {
    KNOWN_ROUTES
        .iter()
        .find(|route| **route == path)
        .copied()
        .unwrap_or("other")
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = route_label(req.uri().path());

    let response = next.run(req).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let labels = [method.as_str(), route, status.as_str()];

    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter.with_label_values(&labels).inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram.with_label_values(&labels).observe(elapsed);
    }

    response
}
