use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Input rejected before it reaches a repository or backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be between {min} and {max} (found {found})")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        found: i64,
    },
    #[error("{field} must not be negative (found {found})")]
    Negative { field: &'static str, found: i64 },
    #[error("period_end {end} precedes period_start {start}")]
    InvertedPeriod { start: String, end: String },
    #[error("destructive action '{action}' requires explicit confirmation")]
    ConfirmationRequired { action: &'static str },
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Domain error taxonomy shared by every tenant-scoped operation.
#[derive(Debug, thiserror::Error)]
pub enum GrcError {
    #[error("{operation} failed: {message}")]
    RemoteOperation { operation: String, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("access denied: missing capability '{capability}'")]
    PermissionDenied { capability: String },
    #[error("tenant required: no active tenant in request context")]
    TenantContextMissing,
    #[error("row belongs to tenant '{found}', caller is tenant '{expected}'")]
    TenantMismatch { expected: String, found: String },
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },
    #[error("{resource} conflict: {detail}")]
    Conflict {
        resource: &'static str,
        detail: String,
    },
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl GrcError {
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GrcError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GrcError::PermissionDenied { .. } | GrcError::TenantMismatch { .. } => {
                StatusCode::FORBIDDEN
            }
            GrcError::TenantContextMissing => StatusCode::BAD_REQUEST,
            GrcError::NotFound { .. } => StatusCode::NOT_FOUND,
            GrcError::Conflict { .. } => StatusCode::CONFLICT,
            GrcError::RemoteOperation { .. } => StatusCode::BAD_GATEWAY,
            GrcError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GrcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Payload(serde_json::Error),
    Domain(GrcError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "invalid configuration: {err}"),
            AppError::Telemetry(err) => write!(f, "logging setup failed: {err}"),
            AppError::Io(err) => write!(f, "i/o failure: {err}"),
            AppError::Server(err) => write!(f, "http server stopped: {err}"),
            AppError::Payload(err) => write!(f, "invalid JSON payload: {err}"),
            AppError::Domain(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Payload(err) => Some(err),
            AppError::Domain(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Domain(err) => err.status_code(),
            AppError::Payload(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

impl From<GrcError> for AppError {
    fn from(value: GrcError) -> Self {
        Self::Domain(value)
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::Domain(GrcError::Validation(value))
    }
}
