use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repository::RepositoryError;

/// AppError
///
/// The failure taxonomy every handler, extractor, and middleware returns. Inner
/// components produce these as plain values; the conversion to an HTTP status and
/// the `{ "error": ... }` envelope happens once, in `IntoResponse`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing/invalid/expired credential, failed login, or unproven entitlement.
    #[error("{0}")]
    Unauthorized(&'static str),
    /// Valid identity without the required privilege.
    #[error("{0}")]
    Forbidden(&'static str),
    /// A uniqueness constraint rejected the insert.
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    /// Anything unexpected. The detail is logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// The uniform JSON error envelope.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(detail) => {
                tracing::error!(%detail, "request failed with internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Repository failures reach the boundary as `Internal` unless a caller has already
/// translated a `Conflict` into its own domain message.
impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict => AppError::Conflict("resource already exists"),
            RepositoryError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}
