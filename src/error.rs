//! Error types for chatrelay
//!
//! All errors implement `IntoResponse` for Axum handlers. The response body is
//! always `{"error": "...", "details"?: "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error(
        "API Key Missing. Set {env_var} in the environment of the chatrelay process before starting it."
    )]
    MissingCredential { env_var: String },

    #[error("{message}")]
    Validation {
        message: String,
        details: Option<String>,
    },

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Upstream API error: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("Request to {endpoint} timed out after {timeout_seconds} seconds")]
    UpstreamTimeout {
        endpoint: String,
        timeout_seconds: u64,
    },

    #[error("Upstream request failed: {0}")]
    UpstreamRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation failure without extra details
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Validation failure carrying the underlying parser message
    pub fn validation_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Upstream { status, .. } => *status,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::MissingCredential { .. }
            | Self::UpstreamTimeout { .. }
            | Self::UpstreamRequest(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metrics label for the `outcome` dimension
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "bad_request",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::MissingCredential { .. } => "config_error",
            Self::Upstream { .. } => "upstream_error",
            Self::UpstreamTimeout { .. } | Self::UpstreamRequest(_) | Self::Internal(_) => {
                "internal_error"
            }
        }
    }
}

/// JSON error body returned to callers
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation { message, details } => ErrorBody {
                error: message,
                details,
            },
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
