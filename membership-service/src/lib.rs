pub mod config;
pub mod db;
pub mod graphql;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use service_core::axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    request_id_middleware, security_headers_middleware, PLAYGROUND_PATH,
};
use service_core::observability::{extract_request_id, REQUEST_ID_HEADER};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::MembershipConfig;
use crate::graphql::{create_schema, GraphQLContext, Schema};
use crate::middleware::metrics_middleware;
use crate::services::{
    AuthorizationMutation, AuthorizationQuery, Datastore, InviteService, MembershipService,
    RoleBindingService, RoleChangeSink, RoleResolver, RoleStore, UserSorter,
};

#[derive(Clone)]
pub struct AppState {
    pub config: MembershipConfig,
    pub datastore: Arc<dyn Datastore>,
    pub schema: Arc<Schema>,
    pub graphql: GraphQLContext,
}

impl AppState {
    /// Wire the engine services onto the given adapters.
    pub fn new(
        config: MembershipConfig,
        authz_query: Arc<dyn AuthorizationQuery>,
        authz_mutation: Arc<dyn AuthorizationMutation>,
        datastore: Arc<dyn Datastore>,
        role_store: Arc<dyn RoleStore>,
        sink: Arc<dyn RoleChangeSink>,
    ) -> Self {
        let membership = MembershipService::new(
            authz_query.clone(),
            datastore.clone(),
            RoleResolver::new(role_store),
            UserSorter::new(config.listing.default_sort),
        );
        let role_bindings = RoleBindingService::new(authz_query, authz_mutation, sink);
        let invites = InviteService::new(datastore.clone(), role_bindings.clone());

        Self {
            config,
            datastore,
            schema: Arc::new(create_schema()),
            graphql: GraphQLContext::new(membership, role_bindings, invites),
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/graphql", post(handlers::graphql::graphql_handler));

    // The playground is a development aid only
    if !state.config.environment.is_prod() {
        app = app.route(PLAYGROUND_PATH, get(handlers::graphql::graphql_playground));
    }

    let request_timeout = Duration::from_secs(state.config.common.request_timeout_seconds);

    let app = app
        .with_state(state.clone())
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Dropping the request future cancels in-flight adapter calls
        .layer(TimeoutLayer::new(request_timeout))
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id =
                    extract_request_id(request.headers()).unwrap_or_else(|| "-".to_string());

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
        // Add CORS layer
        .layer(cors_layer(&state.config.security.allowed_origins));

    Ok(app)
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.datastore.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Datastore health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "datastore": "up"
        }
    })))
}
