//! ==============================================================================
//! error.rs - http error translation
//! ==============================================================================
//!
//! handlers return Result<_, ApiError>; this is the only place a failure is
//! turned into a status code and a `{status: "error", message}` body.
//! extractor rejections (bad query string, undecodable path) land here too.
//!
//! ==============================================================================

use std::any::Any;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::query::QueryError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// caller sent something unusable (bad date, unknown range keyword)
    #[error("{0}")]
    BadRequest(String),
    /// anything else; the process keeps serving
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// build the 500 response for a handler that panicked
    pub fn from_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
        let message = if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "internal server error".to_string()
        };
        tracing::error!(%message, "handler panicked");
        ApiError::Internal(message).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "rejected request");
        }
        let body = ErrorBody { status: "error", message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
