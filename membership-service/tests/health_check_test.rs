//! Health and metrics endpoint integration tests.

mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_returns_200() {
    // Arrange
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    // Act
    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "membership-service-test");
    assert_eq!(body["checks"]["datastore"], "up");
}

#[tokio::test]
async fn health_check_fails_when_datastore_is_down() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.datastore.set_unavailable(true);

    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    let response = app
        .client()
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn playground_is_served_outside_production() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    let response = app
        .client()
        .get(format!("{}/graphiql", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("/graphql"));
}
