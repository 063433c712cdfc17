//! Admin access check.
//!
//! Runs one identity-model verification for the token in
//! `ADMIN_BACKEND_TOKEN` and prints the resulting gate status.
//!
//! # Environment Variables
//!
//! - `ADMIN_BACKEND_URL` - Backend base URL
//! - `ADMIN_BACKEND_TOKEN` - Identity token to check (anonymous if unset)

use std::sync::Arc;

use jobcenter_admin::backend::{BackendError, BackendSlot, Caller, RemoteBackend};
use jobcenter_admin::config::{AdminConfig, ConfigError};
use jobcenter_admin::services::{
    AccessModel, AdminSession, AdminStatus, ErrorOutcome, Verification,
};
use jobcenter_admin::storage::MemoryMarkerStore;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

/// Errors that make the access check fail.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not create backend client: {0}")]
    Client(#[from] BackendError),

    #[error("Could not render status: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered that the caller is not an admin.
    #[error("Caller is not an admin")]
    Denied,

    /// The check itself failed.
    #[error("{0}")]
    Failed(#[from] ErrorOutcome),
}

/// Gate status plus the role the backend reports for the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessReport {
    #[serde(flatten)]
    status: AdminStatus,
    /// `None` when the role lookup itself failed.
    role: Option<String>,
}

impl AccessReport {
    async fn collect(session: &AdminSession) -> Self {
        let role = match session.caller_role().await {
            Ok(role) => Some(role.to_string()),
            Err(outcome) => {
                tracing::warn!(error = %outcome, "Could not read caller role");
                None
            }
        };
        Self {
            status: session.status(),
            role,
        }
    }
}

/// Verify the configured identity and print the gate status.
///
/// # Errors
///
/// Returns an error when configuration is invalid, the caller is not an
/// admin, or the backend call fails.
pub async fn check() -> Result<(), AccessError> {
    let config = AdminConfig::from_env()?;
    let classifier = config.classifier()?;
    let remote = RemoteBackend::new(config.backend.url.clone(), config.backend.timeout)?;
    let caller = config
        .backend
        .token
        .as_ref()
        .map(|token| Caller::with_token(token.expose_secret()))
        .unwrap_or_default();

    tracing::info!(backend = %config.backend.url, "Checking admin access");

    let session = AdminSession::new(
        AccessModel::Identity,
        BackendSlot::ready(Arc::new(remote)),
        Arc::new(classifier),
        Arc::new(MemoryMarkerStore::new()),
        caller,
    );
    let result = session.verify().await;
    let report = AccessReport::collect(&session).await;
    let rendered = serde_json::to_string_pretty(&report)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }

    match result? {
        Verification::Granted => Ok(()),
        Verification::Denied => Err(AccessError::Denied),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jobcenter_admin::backend::ScriptedBackend;
    use jobcenter_admin::services::ErrorClassifier;

    use super::*;

    fn session(backend: &ScriptedBackend) -> AdminSession {
        AdminSession::new(
            AccessModel::Identity,
            BackendSlot::ready(Arc::new(backend.clone())),
            Arc::new(ErrorClassifier::with_defaults("backend")),
            Arc::new(MemoryMarkerStore::new()),
            Caller::with_token("operator-token"),
        )
    }

    #[tokio::test]
    async fn test_report_includes_role() {
        let backend = ScriptedBackend::new();
        let session = session(&backend);
        session.verify().await.unwrap();

        let report = serde_json::to_value(AccessReport::collect(&session).await).unwrap();
        assert_eq!(report["unlocked"], true);
        assert_eq!(report["role"], "admin");
    }

    #[tokio::test]
    async fn test_report_survives_role_failure() {
        let backend = ScriptedBackend::new().with_admin(false);
        backend.fail("caller_role", "connection reset");
        let session = session(&backend);
        session.verify().await.unwrap();

        let report = serde_json::to_value(AccessReport::collect(&session).await).unwrap();
        assert_eq!(report["unlocked"], false);
        assert!(report["role"].is_null());
    }
}
