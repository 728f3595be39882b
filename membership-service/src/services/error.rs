use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Rejected before any external call; the message is shown to the caller.
    #[error("{0}")]
    Validation(String),

    #[error("Authorization service error: {0}")]
    Authorization(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Datastore error: {0}")]
    Datastore(anyhow::Error),

    #[error("Role store error: {0}")]
    RoleStore(anyhow::Error),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Datastore(e) => AppError::DatabaseError(e),
            ServiceError::Authorization(e) => AppError::BadGateway(e.to_string()),
            ServiceError::RoleStore(e) => AppError::InternalError(e),
            e @ ServiceError::Timeout { .. } => AppError::GatewayTimeout(e.to_string()),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let app: AppError = ServiceError::Validation("limit must be positive".into()).into();
        assert_eq!(app.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_timeout_message() {
        let err = ServiceError::Timeout {
            operation: "users_by_ids",
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "users_by_ids timed out after 5000ms");
        let app: AppError = err.into();
        assert_eq!(app.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
