//! Admin gate extractors.
//!
//! [`AdminGate`] resolves the [`AdminSession`] for the current browsing
//! session and caller. [`RequireUnlocked`] additionally rejects the request
//! unless that session is decided and unlocked, and hands the handler the
//! privileged operations wrapper.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn delete_vacancy(
//!     RequireUnlocked(ops): RequireUnlocked,
//!     Path(id): Path<JobId>,
//! ) -> Result<StatusCode, AppError> {
//!     ops.delete_job_vacancy(id).await?;
//!     Ok(StatusCode::NO_CONTENT)
//! }
//! ```

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use moka::future::Cache;
use tower_sessions::Session;
use uuid::Uuid;

use super::session::gate_id;
use crate::backend::Caller;
use crate::error::AppError;
use crate::services::{AdminOperations, AdminSession, ErrorOutcome};
use crate::state::AppState;

/// Live admin sessions keyed by browsing session and caller identity.
///
/// A caller presenting a different token gets a different session, so one
/// identity never inherits another's unlock.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Cache<(Uuid, String), AdminSession>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// The existing session, or a new one built by `build` and restored.
    pub async fn get_or_restore(
        &self,
        gate: Uuid,
        caller: Caller,
        build: impl FnOnce(Caller) -> AdminSession,
    ) -> AdminSession {
        let key = (gate, caller.fingerprint());
        self.sessions
            .get_with(key, async move {
                let session = build(caller);
                session.restore().await;
                session
            })
            .await
    }
}

/// Caller identity from the `Authorization: Bearer` header.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed header.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(Caller::anonymous());
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::BadRequest("Authorization header is not valid text".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Expected a Bearer token".to_string()))?;
    Ok(Caller::with_token(token))
}

/// The admin session for this request.
pub struct AdminGate(pub AdminSession);

impl FromRequestParts<AppState> for AdminGate {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;
        let gate = gate_id(&session).await?;
        let caller = caller_from_headers(&parts.headers)?;

        Ok(Self(state.session_for(gate, caller).await))
    }
}

/// Rejects with 401 unless the admin panel is unlocked.
///
/// The rejection carries the last failure message, so a user bounced by an
/// auto-lock sees why.
pub struct RequireUnlocked(pub AdminOperations);

impl FromRequestParts<AppState> for RequireUnlocked {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.backend().is_ready() {
            return Err(ErrorOutcome::not_ready().into());
        }

        let AdminGate(session) = AdminGate::from_request_parts(parts, state).await?;
        let status = session.settle().await;
        if !status.is_open() {
            return Err(AppError::Locked {
                reason: status
                    .last_error
                    .unwrap_or_else(|| ErrorOutcome::locked().user_message),
            });
        }

        Ok(Self(state.operations(session)))
    }
}
