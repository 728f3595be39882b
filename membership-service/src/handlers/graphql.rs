use juniper::http::{graphiql::graphiql_source, GraphQLRequest};
use service_core::axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::AppState;

/// GraphQL POST endpoint
pub async fn graphql_handler(
    State(state): State<AppState>,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    let response = request.execute(&state.schema, &state.graphql).await;
    let status = if response.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    (status, Json(response)).into_response()
}

/// GraphQL playground (GraphiQL), served outside production only.
pub async fn graphql_playground() -> Html<String> {
    Html(graphiql_source("/graphql", None))
}
