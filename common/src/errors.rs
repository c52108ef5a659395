//! Application error types.
//!
//! Every public operation returns [`AppResult`]. At the HTTP boundary an
//! [`AppError`] is logged with its full detail and turned into a
//! `{"msg": ...}` body that never echoes the underlying cause.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ErrorPayload;

/// Message returned to callers for every failure of an explorer operation.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "There was a problem during data processing. Check log for more information.";

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No connection profile is registered under the instance name.
    InstanceNotFound,
    /// A profile exists but the database could not be reached.
    ConnectionFailed,
    /// Anything that went wrong after a connection was obtained.
    DataAccessFailure,
    /// Problems with the profile registry itself.
    Registry,
}

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database instance `{0}` does not exist")]
    InstanceNotFound(String),

    #[error("could not connect to `{instance}` database instance: {reason}")]
    ConnectionFailed { instance: String, reason: String },

    #[error("data access failure: {0}")]
    DataAccess(String),

    /// A caller supplied name failed the syntactic identifier check.
    #[error("rejected identifier {name:?}: {reason}")]
    UnsafeIdentifier { name: String, reason: String },

    /// A caller supplied name is not present in the database catalog.
    #[error("{object} {name:?} is not present in the database catalog")]
    UnknownIdentifier { object: &'static str, name: String },

    #[error("profile store error: {0}")]
    ProfileStore(String),

    #[error("database instance `{0}` is already registered")]
    InstanceExists(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InstanceNotFound(_) => ErrorKind::InstanceNotFound,
            AppError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            AppError::DataAccess(_)
            | AppError::UnsafeIdentifier { .. }
            | AppError::UnknownIdentifier { .. } => ErrorKind::DataAccessFailure,
            AppError::ProfileStore(_) | AppError::InstanceExists(_) | AppError::Validation(_) => {
                ErrorKind::Registry
            }
        }
    }

    /// HTTP status used when the error reaches the router.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InstanceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConnectionFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::UnsafeIdentifier { .. } | AppError::UnknownIdentifier { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::DataAccess(_) | AppError::ProfileStore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InstanceExists(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message that may be shown to the caller.
    ///
    /// Registration errors describe caller input and are returned as is;
    /// everything else collapses into [`GENERIC_FAILURE_MESSAGE`].
    pub fn public_message(&self) -> String {
        match self {
            AppError::InstanceExists(_) | AppError::Validation(_) => self.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::InstanceExists(_) | AppError::Validation(_) => {
                tracing::warn!(error = %self, status = status.as_u16(), "Request rejected")
            }
            _ => tracing::error!(
                error = %self,
                kind = ?self.kind(),
                status = status.as_u16(),
                "Request failed"
            ),
        }
        (status, Json(ErrorPayload::new(self.public_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            AppError::InstanceNotFound("x".into()).kind(),
            ErrorKind::InstanceNotFound
        );
        assert_eq!(
            AppError::ConnectionFailed {
                instance: "x".into(),
                reason: "refused".into()
            }
            .kind(),
            ErrorKind::ConnectionFailed
        );
        assert_eq!(
            AppError::UnsafeIdentifier {
                name: "t;".into(),
                reason: "terminator".into()
            }
            .kind(),
            ErrorKind::DataAccessFailure
        );
    }

    #[tokio::test]
    async fn test_response_hides_cause() {
        let err = AppError::DataAccess("relation \"secret_table\" does not exist".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({ "msg": GENERIC_FAILURE_MESSAGE }));
    }

    #[tokio::test]
    async fn test_instance_not_found_status() {
        let response = AppError::InstanceNotFound("warehouse".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["msg"], GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_validation_message_is_public() {
        let response = AppError::InstanceExists("warehouse".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(
            body["msg"],
            "database instance `warehouse` is already registered"
        );
    }
}
