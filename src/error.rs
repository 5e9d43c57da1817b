use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::state::{coordinator::PollError, registry::RegistryError};

/// Errors that can occur in service layer operations.
///
/// Every variant is recoverable: WebSocket commands report it back to the
/// originating connection as an `operation_rejected` message.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Command issued by a connection holding the wrong role (or none).
    #[error("role violation: {0}")]
    RoleViolation(String),
    /// A poll is running and not every student has answered.
    #[error("a poll is already in progress")]
    PollInProgress,
    /// The command needs a running poll.
    #[error("no poll is active")]
    NoActivePoll,
    /// The submitted option is not part of the active poll.
    #[error("`{0}` is not an option of the active poll")]
    InvalidOption(String),
    /// The student already answered the active poll.
    #[error("`{0}` has already answered")]
    AlreadyAnswered(String),
    /// Requested participant or resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed or invalid payload.
    #[error("invalid payload: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Stable, machine-readable code carried by `operation_rejected`.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ServiceError::RoleViolation(_) => "role_violation",
            ServiceError::PollInProgress => "poll_in_progress",
            ServiceError::NoActivePoll => "no_active_poll",
            ServiceError::InvalidOption(_) => "invalid_option",
            ServiceError::AlreadyAnswered(_) => "already_answered",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidInput(_) => "invalid_payload",
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {}", err))
    }
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => {
                ServiceError::NotFound(format!("participant `{name}`"))
            }
            RegistryError::AlreadyAnswered(name) => ServiceError::AlreadyAnswered(name),
            RegistryError::MissingName => ServiceError::InvalidInput(err.to_string()),
        }
    }
}

impl From<PollError> for ServiceError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::PollInProgress => ServiceError::PollInProgress,
            PollError::NoActivePoll => ServiceError::NoActivePoll,
            PollError::InvalidOption(option) => ServiceError::InvalidOption(option),
            PollError::Registry(inner) => inner.into(),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Operation not allowed for the caller.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::RoleViolation(message) => AppError::Forbidden(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::NoActivePoll => AppError::NotFound("no active poll".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidOption(_) => AppError::BadRequest(err.to_string()),
            ServiceError::PollInProgress | ServiceError::AlreadyAnswered(_) => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
