//! Error types for the tenantbox server.
//!
//! Every error leaves the server as a JSON body of the form `{"error": "<message>"}` with a
//! status code chosen by [`ServerError::status_code`].

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tenantbox_core::TenantboxError;
use thiserror::Error;

use crate::payload::ErrorResponse;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a server-related operation.
pub type ServerResult<T> = Result<T, ServerError>;

/// An error that occurred while serving a request or setting up the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request was rejected before reaching the container runtime.
    #[error(transparent)]
    ValidationError(#[from] ValidationError),

    /// The addressed container or route does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The route exists but does not accept the request method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The request body exceeds the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The operation failed on the server side.
    #[error("{0}")]
    InternalError(String),

    /// The server configuration is invalid.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// The request did not complete before the server-side deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// A request validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A parameter is missing or not one of the accepted values.
    #[error("{0}")]
    InvalidInput(String),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalError(_) | Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<TenantboxError> for ServerError {
    fn from(err: TenantboxError) -> Self {
        match err {
            TenantboxError::InvalidRequest(msg) => {
                Self::ValidationError(ValidationError::InvalidInput(msg))
            }
            TenantboxError::ContainerNotFound(_) => Self::NotFound(err.to_string()),
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
