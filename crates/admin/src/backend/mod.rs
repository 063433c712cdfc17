//! Remote job-board backend, as seen by the admin core.
//!
//! The backend owns all data and all authorization decisions. The admin core
//! only needs "success value or failure with a message" from it, so the
//! interface is a trait and failures are an opaque [`BackendError`].
//!
//! # Readiness
//!
//! The backend client is created asynchronously at startup (the server probes
//! the remote before trusting it). Until then the [`BackendSlot`] is empty and
//! every admin operation fails fast with "System not ready".

mod remote;
#[cfg(any(test, feature = "test-util"))]
mod scripted;

pub use remote::RemoteBackend;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{NOT_ADMIN_MESSAGE, ScriptedBackend};

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use jobcenter_core::{
    JobId, JobVacancy, NewJobVacancy, NewPost, Post, PostId, SearchableUserProfile, UserRole,
};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A backend call failure.
///
/// Only the message text is available; the backend guarantees no structured
/// error codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Wrap a failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message as reported.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Identity on whose behalf a backend call is made.
///
/// Callers present a bearer token issued by the identity provider; the
/// backend resolves it to a principal and role. Anonymous callers have none.
#[derive(Clone, Default)]
pub struct Caller {
    token: Option<SecretString>,
}

impl Caller {
    /// Unauthenticated caller.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// Caller identified by a bearer token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
        }
    }

    /// The bearer token, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Stable, non-reversible identifier for keying per-caller state.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.token.as_ref().map_or_else(
            || "anonymous".to_owned(),
            |token| hex::encode(Sha256::digest(token.expose_secret().as_bytes())),
        )
    }
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Operations the admin core consumes from the backend.
///
/// Everything marked privileged is rejected by the backend for callers
/// without the admin role; those calls must go through
/// [`AdminOperations`](crate::services::AdminOperations).
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// Whether the caller currently holds the admin role.
    async fn is_caller_admin(&self, caller: &Caller) -> Result<bool, BackendError>;

    /// The caller's role.
    async fn caller_role(&self, caller: &Caller) -> Result<UserRole, BackendError>;

    /// All published vacancies.
    async fn list_job_vacancies(&self) -> Result<Vec<JobVacancy>, BackendError>;

    /// All announcements.
    async fn list_posts(&self) -> Result<Vec<Post>, BackendError>;

    /// Publish a vacancy. Privileged.
    async fn create_job_vacancy(
        &self,
        caller: &Caller,
        vacancy: &NewJobVacancy,
    ) -> Result<JobId, BackendError>;

    /// Replace a vacancy. Privileged.
    async fn update_job_vacancy(
        &self,
        caller: &Caller,
        id: JobId,
        vacancy: &NewJobVacancy,
    ) -> Result<(), BackendError>;

    /// Remove a vacancy. Privileged.
    async fn delete_job_vacancy(&self, caller: &Caller, id: JobId) -> Result<(), BackendError>;

    /// Publish an announcement. Privileged.
    async fn create_post(&self, caller: &Caller, post: &NewPost) -> Result<PostId, BackendError>;

    /// Replace an announcement. Privileged.
    async fn update_post(
        &self,
        caller: &Caller,
        id: PostId,
        post: &NewPost,
    ) -> Result<(), BackendError>;

    /// Remove an announcement. Privileged.
    async fn delete_post(&self, caller: &Caller, id: PostId) -> Result<(), BackendError>;

    /// Search user profiles by name or email; `None` lists everyone. Privileged.
    async fn authorized_user_search(
        &self,
        caller: &Caller,
        term: Option<&str>,
    ) -> Result<Vec<SearchableUserProfile>, BackendError>;
}

/// Holder for the backend client once it has been initialized.
///
/// Cheap to clone; all clones observe the same client.
#[derive(Clone, Default)]
pub struct BackendSlot {
    inner: Arc<RwLock<Option<Arc<dyn AdminBackend>>>>,
}

impl BackendSlot {
    /// A slot with no backend yet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A slot that is ready immediately.
    #[must_use]
    pub fn ready(backend: Arc<dyn AdminBackend>) -> Self {
        let slot = Self::empty();
        slot.install(backend);
        slot
    }

    /// Make `backend` available to every holder of this slot.
    pub fn install(&self, backend: Arc<dyn AdminBackend>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(backend);
        tracing::info!("Backend client ready");
    }

    /// The backend, if initialized.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn AdminBackend>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the backend has been initialized.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}
