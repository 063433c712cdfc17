//! Admin gate route handlers.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::AdminGate;
use crate::services::{AdminSession, AdminStatus};

/// Unlock request body. Identity-model servers ignore the password.
#[derive(Debug, Default, Deserialize)]
pub struct UnlockRequest {
    #[serde(default)]
    pub password: String,
}

/// Gate state plus the access model in use.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: AdminStatus,
    pub access_model: &'static str,
}

impl StatusResponse {
    fn from_session(session: &AdminSession, status: AdminStatus) -> Self {
        Self {
            status,
            access_model: session.model().name(),
        }
    }
}

/// Current gate state, after any pending re-verification settles.
pub async fn status(AdminGate(session): AdminGate) -> Json<StatusResponse> {
    let status = session.settle().await;
    Json(StatusResponse::from_session(&session, status))
}

/// Attempt to unlock the admin panel.
#[instrument(skip_all)]
pub async fn unlock(
    AdminGate(session): AdminGate,
    body: Option<Json<UnlockRequest>>,
) -> Result<Json<StatusResponse>, AppError> {
    let Json(request) = body.unwrap_or_default();

    session.unlock(&request.password).await.map_err(|outcome| {
        if outcome.is_rejected_unlock() {
            AppError::Unlock(outcome)
        } else {
            AppError::Backend(outcome)
        }
    })?;

    Ok(Json(StatusResponse::from_session(&session, session.status())))
}

/// Lock the admin panel.
#[instrument(skip_all)]
pub async fn lock(AdminGate(session): AdminGate) -> Json<StatusResponse> {
    session.lock().await;
    Json(StatusResponse::from_session(&session, session.status()))
}
