//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dinopark_core::store::StoreError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A zone code in the request path is not on the park grid.
    #[error("invalid zone code: {0}")]
    InvalidZone(String),

    /// The entity store failed while serving the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidZone(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Store(StoreError::Unavailable(msg)) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            Self::Store(StoreError::MalformedRow(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
