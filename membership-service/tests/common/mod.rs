//! Test helper module for membership-service integration tests.
//!
//! Serves the real router over in-memory adapters, so no database or
//! authorization store is needed.

#![allow(dead_code)]

use membership_service::{
    build_router,
    config::{
        AuthzConfig, DatabaseConfig, ListingConfig, MembershipConfig, SecurityConfig,
    },
    models::{EntityRef, Invite, RoleSet, SortBy, User},
    services::{Datastore, InMemoryAuthz, InMemoryDatastore, RecordingRoleChangeSink},
    AppState,
};
use service_core::config::{Config, Environment};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const TENANT: &str = "tenant-acme";

/// Test application with a running HTTP server.
pub struct TestApp {
    pub address: String,
    pub authz: Arc<InMemoryAuthz>,
    pub datastore: Arc<InMemoryDatastore>,
    pub sink: Arc<RecordingRoleChangeSink>,
}

impl TestApp {
    /// Spawn the application on a random local port.
    pub async fn spawn() -> anyhow::Result<Self> {
        let authz = Arc::new(InMemoryAuthz::new());
        let datastore = Arc::new(InMemoryDatastore::new());
        let sink = Arc::new(RecordingRoleChangeSink::new());

        let state = AppState::new(
            create_test_config(),
            authz.clone(),
            authz.clone(),
            datastore.clone(),
            datastore.clone(),
            sink.clone(),
        );
        let app = build_router(state).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = format!("http://{}", listener.local_addr()?);

        tokio::spawn(async move {
            let _ = service_core::axum::serve(listener, app).await;
        });

        Ok(TestApp {
            address,
            authz,
            datastore,
            sink,
        })
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    /// POST a GraphQL document and return the decoded body.
    pub async fn graphql(&self, query: &str) -> serde_json::Value {
        self.client()
            .post(format!("{}/graphql", self.address))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .expect("Failed to parse response")
    }

    /// Seed an account and grant it `roles` (comma-joined) on `entity`.
    pub fn add_member(&self, entity: &EntityRef, user: User, roles: &str) {
        self.authz.grant(entity, &user.user_id, RoleSet::parse(roles));
        self.datastore.add_user(user);
    }

    pub async fn add_invite(&self, entity: &EntityRef, email: &str, roles: &str) {
        let invite = Invite::new(TENANT, email, entity, &RoleSet::parse(roles));
        self.datastore
            .upsert_invite(&invite)
            .await
            .expect("Failed to seed invite");
    }
}

pub fn create_test_config() -> MembershipConfig {
    MembershipConfig {
        common: Config {
            port: 0,
            request_timeout_seconds: 30,
        },
        environment: Environment::Dev,
        service_name: "membership-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 0,
            search_timeout_ms: 1000,
        },
        authz: AuthzConfig {
            api_url: "http://unused".to_string(),
            store_id: "test-store".to_string(),
            api_token: None,
            timeout_ms: 1000,
        },
        listing: ListingConfig {
            default_sort: SortBy::default(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

pub fn project() -> EntityRef {
    EntityRef::new("project", "acme-proj")
}
