//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{ErrorCategory, ErrorOutcome};

/// Application-level error type for the admin gate.
#[derive(Debug, Error)]
pub enum AppError {
    /// A backend operation failed; already classified.
    #[error("{0}")]
    Backend(ErrorOutcome),

    /// An unlock attempt was rejected (wrong password, not an admin).
    #[error("{0}")]
    Unlock(ErrorOutcome),

    /// The admin panel is locked or still verifying.
    #[error("{reason}")]
    Locked { reason: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ErrorOutcome> for AppError {
    fn from(outcome: ErrorOutcome) -> Self {
        Self::Backend(outcome)
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session store: {err}"))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<ErrorCategory>,
    /// The admin session is locked after this response.
    locked: bool,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Backend(outcome) if outcome.is_not_ready() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Backend(outcome) => match outcome.category {
                ErrorCategory::StoppedService => StatusCode::SERVICE_UNAVAILABLE,
                ErrorCategory::Unauthorized => StatusCode::FORBIDDEN,
                ErrorCategory::Generic => StatusCode::BAD_GATEWAY,
            },
            Self::Unlock(_) | Self::Locked { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        let operator_fixable = matches!(
            &self,
            Self::Backend(outcome) if outcome.category == ErrorCategory::StoppedService
        );
        if operator_fixable || matches!(self, Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Backend(outcome) | Self::Unlock(outcome) => ErrorBody {
                error: outcome.user_message,
                category: Some(outcome.category),
                locked: outcome.should_lock_session,
            },
            Self::Locked { reason } => ErrorBody {
                error: reason,
                category: None,
                locked: true,
            },
            Self::Internal(_) => ErrorBody {
                error: "Internal server error".to_string(),
                category: None,
                locked: false,
            },
            other => ErrorBody {
                error: other.to_string(),
                category: None,
                locked: false,
            },
        };

        (status, Json(body)).into_response()
    }
}
