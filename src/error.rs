use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// ErrorBody
///
/// Fixed JSON shape of every rejection produced by the gateway and by collaborator handlers.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    error: &'a str,
}

fn error_response(status: StatusCode, message: &str, code: &str) -> Response {
    let body = ErrorBody {
        success: false,
        message,
        error: code,
    };
    (status, Json(body)).into_response()
}

/// GatewayError
///
/// Expected, user-facing outcomes of the authentication gateway. None of these is a server
/// fault; each maps to a terminal 401 or 403.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no credential presented on a protected route")]
    NoCredential,
    #[error("credential failed verification")]
    InvalidCredential,
    #[error("role not permitted for this route")]
    InsufficientPermission,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NoCredential | GatewayError::InvalidCredential => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::InsufficientPermission => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::NoCredential => "NO_TOKEN",
            GatewayError::InvalidCredential => "INVALID_TOKEN",
            GatewayError::InsufficientPermission => "FORBIDDEN",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::NoCredential => "Authentication required",
            GatewayError::InvalidCredential => "Invalid or expired token",
            GatewayError::InsufficientPermission => "Insufficient permissions",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.user_message(), self.error_code())
    }
}

/// ApiError
///
/// Failures of the collaborator handlers (login, registration, profile lookups).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details stay in the logs.
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed with internal error");
            return error_response(self.status_code(), "Internal server error", self.error_code());
        }
        let message = self.to_string();
        error_response(self.status_code(), &message, self.error_code())
    }
}

/// StoreError
///
/// Failures of the identity store. `EmailTaken` is the only expected outcome; everything else is
/// a backend fault and surfaces as a 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already registered")]
    EmailTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt user record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => ApiError::Conflict("User already exists".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// ConfigError
///
/// Startup-time faults. Any of these keeps the process from serving requests.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("JWT_SECRET is still the insecure default; refusing to start in production")]
    InsecureSecret,
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("malformed access rule #{index}: {reason}")]
    MalformedRule { index: usize, reason: String },
}
