//! Client error types

use crate::client::token::StoreError;
use nutrilabel_core::CoreError;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure or request construction error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The response envelope reported a failure
    #[error(transparent)]
    Api(#[from] CoreError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token storage could not be read or written
    #[error("Token storage error: {0}")]
    Storage(#[from] StoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The refresh endpoint answered `isSuccess: false`
    #[error("Token refresh rejected: {0}")]
    RefreshRejected(String),

    /// The refresh call did not settle in time
    #[error("Token refresh timed out after {0:?}")]
    RefreshTimeout(Duration),

    /// The refreshing request was dropped before the refresh settled
    #[error("Token refresh abandoned before completion")]
    RefreshAbandoned,

    /// The shared token refresh failed; every request waiting on it sees the same cause
    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] Arc<ClientError>),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status carried by this error, looking through refresh failures
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::BadRequest(_) => Some(StatusCode::BAD_REQUEST),
            Self::AuthenticationFailed(_) => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::ServerError { status, .. } => StatusCode::from_u16(*status).ok(),
            Self::Request(err) => err.status(),
            Self::RefreshFailed(cause) => cause.status(),
            _ => None,
        }
    }

    /// Whether the server rejected the credentials (HTTP 401)
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
