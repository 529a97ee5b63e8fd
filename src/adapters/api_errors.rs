use {
    crate::domain::error::AuditError,
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
};

/// Newtype so the domain error can be turned into an axum response.
pub struct ApiError(pub AuditError);

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            AuditError::PermissionDenied { .. } => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                self.0.to_string(),
            ),
            AuditError::ActorNotFound(_) => (
                StatusCode::FORBIDDEN,
                "actor_not_found",
                self.0.to_string(),
            ),
            AuditError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                err.to_string(),
            ),
            AuditError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.0.to_string()),
            AuditError::Persistence(err) => {
                tracing::error!("persistence error: {err}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "persistence_error",
                    "audit log could not be stored, retry later".to_string(),
                )
            }
            other => {
                tracing::error!("internal error: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
