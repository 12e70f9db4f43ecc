//! Custom error types for the gateway service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::SessionError;
use serde_json::json;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Custom error type for the gateway service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, unknown or expired session
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// Upstream answered the login call without authenticating the user
    #[error("login failed: empty user id")]
    LoginRejected,

    /// Upstream could not be reached
    #[error("upstream request failed")]
    UpstreamUnreachable,

    /// Session could not be created
    #[error("create session failed")]
    Session(#[from] SessionError),

    /// Internal server error
    #[error("internal server error")]
    InternalServerError,
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::InvalidInput(msg) => ApiError::BadRequest(msg),
            UpstreamError::LoginRejected => ApiError::LoginRejected,
            UpstreamError::Unreachable(_) => ApiError::UpstreamUnreachable,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::LoginRejected | ApiError::UpstreamUnreachable => StatusCode::BAD_GATEWAY,
            ApiError::Session(_) | ApiError::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Session(err) = &self {
            tracing::error!("Failed to create session: {}", err);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
