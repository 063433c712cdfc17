//! Admin unlock/lock lifecycle.
//!
//! An [`AdminSession`] decides whether privileged operations are currently
//! permitted for one browsing session. Two access models are supported:
//!
//! - **Identity** (default): the backend decides. Unlocking asks the backend
//!   whether the caller holds the admin role, and only a boolean "unlocked"
//!   marker is persisted.
//! - **Password**: a shared secret from configuration. Unlocking compares the
//!   entered value; the value itself is persisted so a reload stays unlocked
//!   without a network call.
//!
//! # Concurrency
//!
//! At most one verification is in flight. Concurrent [`AdminSession::verify`]
//! callers attach to the same shared future and observe the same result.
//! [`AdminSession::lock`] bumps a generation counter; a verification that
//! started under an older generation is discarded when it settles, so a late
//! success can never reopen a session that was explicitly locked.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jobcenter_core::UserRole;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use super::classifier::{ErrorClassifier, ErrorOutcome};
use crate::backend::{BackendSlot, Caller};
use crate::storage::{AccessMarker, MarkerStore};

/// How the admin panel is unlocked.
#[derive(Clone)]
pub enum AccessModel {
    /// The backend verifies that the caller holds the admin role.
    Identity,
    /// A shared secret from configuration.
    Password(SecretString),
}

impl AccessModel {
    /// Short name for logs and status output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Password(_) => "password",
        }
    }
}

impl std::fmt::Debug for AccessModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Password(_) => f.write_str("Password([REDACTED])"),
        }
    }
}

/// Successful answer from a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The caller may use the admin panel.
    Granted,
    /// The caller is not an admin. Expected, not an error.
    Denied,
}

/// What the admin gate needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub unlocked: bool,
    /// A verification is outstanding; the session is undecided.
    pub checking: bool,
    /// User message of the most recent failure, if any.
    pub last_error: Option<String>,
}

impl AdminStatus {
    /// Whether protected content may be shown.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.unlocked && !self.checking
    }
}

type PendingVerification = Shared<BoxFuture<'static, Result<Verification, ErrorOutcome>>>;

/// What an unlocked session was unlocked with.
enum Grant {
    Credential(SecretString),
    Role(UserRole),
}

enum Access {
    Locked,
    Unlocked(Grant),
}

struct SessionState {
    access: Access,
    last_error: Option<ErrorOutcome>,
    pending: Option<PendingVerification>,
    generation: u64,
}

struct SessionInner {
    model: AccessModel,
    backend: BackendSlot,
    classifier: Arc<ErrorClassifier>,
    store: Arc<dyn MarkerStore>,
    caller: Caller,
    state: Mutex<SessionState>,
}

/// Admin access state for one browsing session.
///
/// Cheap to clone; clones share state. Created locked.
#[derive(Clone)]
pub struct AdminSession {
    inner: Arc<SessionInner>,
}

impl AdminSession {
    /// Create a locked session.
    #[must_use]
    pub fn new(
        model: AccessModel,
        backend: BackendSlot,
        classifier: Arc<ErrorClassifier>,
        store: Arc<dyn MarkerStore>,
        caller: Caller,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                model,
                backend,
                classifier,
                store,
                caller,
                state: Mutex::new(SessionState {
                    access: Access::Locked,
                    last_error: None,
                    pending: None,
                    generation: 0,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Pick up a previous unlock from marker storage.
    ///
    /// Password model: a stored credential equal to the configured secret
    /// unlocks immediately, with no network call. Identity model: a stored
    /// flag schedules exactly one re-verification; the session reports
    /// `checking` until it settles.
    #[instrument(skip(self), fields(model = self.inner.model.name()))]
    pub async fn restore(&self) {
        let marker = match self.inner.store.load().await {
            Ok(marker) => marker,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read admin marker");
                None
            }
        };

        match (&self.inner.model, marker) {
            (AccessModel::Password(expected), Some(AccessMarker::Credential(stored))) => {
                if stored.expose_secret() == expected.expose_secret() {
                    self.state().access = Access::Unlocked(Grant::Credential(stored));
                    tracing::info!("Admin panel restored from stored credential");
                } else {
                    tracing::info!("Stored admin credential no longer matches; discarding");
                    self.clear_marker().await;
                }
            }
            (AccessModel::Identity, Some(AccessMarker::Unlocked)) => {
                let mut state = self.state();
                if state.pending.is_none() {
                    let generation = state.generation;
                    state.pending = Some(self.start_verification(generation));
                    tracing::debug!("Admin re-verification scheduled");
                }
            }
            (_, Some(other)) => {
                tracing::debug!(key = other.key(), "Ignoring marker from other access model");
            }
            (_, None) => {}
        }
    }

    /// Ask whether the caller may use the admin panel.
    ///
    /// Joins the in-flight verification if there is one. Granted unlocks and
    /// persists the marker; denied locks and clears it without recording an
    /// error; a backend failure is classified, recorded as the last error,
    /// and locks when the classification says so.
    ///
    /// # Errors
    ///
    /// Returns the classified outcome when the backend call fails, the
    /// not-ready outcome when no backend is available, or the locked outcome
    /// when the session was locked while this verification was in flight.
    pub async fn verify(&self) -> Result<Verification, ErrorOutcome> {
        if !self.inner.backend.is_ready() {
            return Err(ErrorOutcome::not_ready());
        }

        let pending = {
            let mut state = self.state();
            if let Some(pending) = &state.pending {
                pending.clone()
            } else {
                let generation = state.generation;
                let pending = self.start_verification(generation);
                state.pending = Some(pending.clone());
                pending
            }
        };
        pending.await
    }

    /// Unlock with an entered credential.
    ///
    /// The identity model ignores `credential` and verifies the caller's role
    /// instead.
    ///
    /// # Errors
    ///
    /// Returns the incorrect-credential outcome on a password mismatch (marker
    /// storage is not touched), the access-denied outcome when the backend
    /// says the caller is not an admin, or whatever [`verify`](Self::verify)
    /// returns.
    #[instrument(skip(self, credential), fields(model = self.inner.model.name()))]
    pub async fn unlock(&self, credential: &str) -> Result<(), ErrorOutcome> {
        if !self.inner.backend.is_ready() {
            return Err(ErrorOutcome::not_ready());
        }

        match &self.inner.model {
            AccessModel::Password(expected) => {
                if credential != expected.expose_secret() {
                    tracing::info!("Admin unlock rejected: incorrect password");
                    return Err(ErrorOutcome::incorrect_credential());
                }
                let generation = self.state().generation;
                self.apply(generation, Ok(Verification::Granted))
                    .await
                    .map(|_| ())
            }
            AccessModel::Identity => match self.verify().await? {
                Verification::Granted => Ok(()),
                Verification::Denied => Err(ErrorOutcome::access_denied()),
            },
        }
    }

    /// Lock the panel and forget the stored marker. Idempotent.
    ///
    /// Any verification in flight is discarded when it settles.
    #[instrument(skip(self), fields(model = self.inner.model.name()))]
    pub async fn lock(&self) {
        let was_unlocked = {
            let mut state = self.state();
            state.generation += 1;
            state.pending = None;
            state.last_error = None;
            matches!(
                std::mem::replace(&mut state.access, Access::Locked),
                Access::Unlocked(_)
            )
        };
        self.clear_marker().await;
        if was_unlocked {
            tracing::info!("Admin panel locked");
        }
    }

    /// Auto-lock after a failure, keeping `outcome` as the reason to show.
    pub async fn lock_with_reason(&self, outcome: ErrorOutcome) {
        self.lock().await;
        tracing::warn!(
            category = %outcome.category,
            message = %outcome.user_message,
            "Admin session auto-locked"
        );
        self.state().last_error = Some(outcome);
    }

    /// Current gate-facing state.
    #[must_use]
    pub fn status(&self) -> AdminStatus {
        let state = self.state();
        AdminStatus {
            unlocked: matches!(state.access, Access::Unlocked(_)),
            checking: state.pending.is_some(),
            last_error: state.last_error.as_ref().map(|e| e.user_message.clone()),
        }
    }

    /// Wait for any outstanding verification, then report state.
    pub async fn settle(&self) -> AdminStatus {
        let pending = self.state().pending.clone();
        if let Some(pending) = pending {
            // The outcome is already folded into session state.
            let _ = pending.await;
        }
        self.status()
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state().access, Access::Unlocked(_))
    }

    #[must_use]
    pub fn is_checking(&self) -> bool {
        self.state().pending.is_some()
    }

    /// Most recent failure outcome.
    #[must_use]
    pub fn last_error(&self) -> Option<ErrorOutcome> {
        self.state().last_error.clone()
    }

    /// Role confirmed by the backend, for identity-model sessions.
    #[must_use]
    pub fn granted_role(&self) -> Option<UserRole> {
        match &self.state().access {
            Access::Unlocked(Grant::Role(role)) => Some(*role),
            Access::Unlocked(Grant::Credential(_)) | Access::Locked => None,
        }
    }

    /// Ask the backend for the caller's current role.
    ///
    /// Read-only: the session state is not changed, whatever the answer.
    ///
    /// # Errors
    ///
    /// Returns the not-ready outcome or the classified backend failure.
    pub async fn caller_role(&self) -> Result<UserRole, ErrorOutcome> {
        let backend = self.inner.backend.get().ok_or_else(ErrorOutcome::not_ready)?;
        backend
            .caller_role(&self.inner.caller)
            .await
            .map_err(|e| self.inner.classifier.classify(e.message()))
    }

    #[must_use]
    pub fn model(&self) -> &AccessModel {
        &self.inner.model
    }

    #[must_use]
    pub fn caller(&self) -> &Caller {
        &self.inner.caller
    }

    #[must_use]
    pub fn backend(&self) -> &BackendSlot {
        &self.inner.backend
    }

    #[must_use]
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.inner.classifier
    }

    // =========================================================================
    // Verification internals
    // =========================================================================

    fn start_verification(&self, generation: u64) -> PendingVerification {
        let session: Weak<SessionInner> = Arc::downgrade(&self.inner);
        async move {
            let Some(inner) = session.upgrade() else {
                return Err(ErrorOutcome::not_ready());
            };
            let session = Self { inner };
            let result = session.check().await;
            session.apply(generation, result).await
        }
        .boxed()
        .shared()
    }

    async fn check(&self) -> Result<Verification, ErrorOutcome> {
        let Some(backend) = self.inner.backend.get() else {
            return Err(ErrorOutcome::not_ready());
        };

        match &self.inner.model {
            AccessModel::Identity => match backend.is_caller_admin(&self.inner.caller).await {
                Ok(true) => Ok(Verification::Granted),
                Ok(false) => Ok(Verification::Denied),
                Err(e) => {
                    tracing::debug!(error = %e, "Admin role check failed");
                    Err(self.inner.classifier.classify(e.message()))
                }
            },
            AccessModel::Password(expected) => {
                let holds_secret = matches!(
                    &self.state().access,
                    Access::Unlocked(Grant::Credential(held))
                        if held.expose_secret() == expected.expose_secret()
                );
                Ok(if holds_secret {
                    Verification::Granted
                } else {
                    Verification::Denied
                })
            }
        }
    }

    fn grant(&self) -> (Grant, AccessMarker) {
        match &self.inner.model {
            AccessModel::Identity => (Grant::Role(UserRole::Admin), AccessMarker::Unlocked),
            AccessModel::Password(secret) => (
                Grant::Credential(secret.clone()),
                AccessMarker::Credential(secret.clone()),
            ),
        }
    }

    /// Fold a verification result into session state, unless the session was
    /// locked since `generation`.
    async fn apply(
        &self,
        generation: u64,
        result: Result<Verification, ErrorOutcome>,
    ) -> Result<Verification, ErrorOutcome> {
        match result {
            Ok(Verification::Granted) => {
                if self.is_stale(generation) {
                    return Err(self.discard());
                }
                let (grant, marker) = self.grant();
                if let Err(e) = self.inner.store.save(&marker).await {
                    tracing::warn!(error = %e, "Could not persist admin marker");
                }
                {
                    let mut state = self.state();
                    if state.generation == generation {
                        state.access = Access::Unlocked(grant);
                        state.last_error = None;
                        state.pending = None;
                        drop(state);
                        tracing::info!(model = self.inner.model.name(), "Admin panel unlocked");
                        return Ok(Verification::Granted);
                    }
                }
                // Locked while the marker was being written.
                self.clear_marker().await;
                Err(self.discard())
            }
            Ok(Verification::Denied) => {
                {
                    let mut state = self.state();
                    if state.generation != generation {
                        drop(state);
                        return Err(self.discard());
                    }
                    state.access = Access::Locked;
                    state.pending = None;
                }
                self.clear_marker().await;
                tracing::info!("Admin access denied by backend");
                Ok(Verification::Denied)
            }
            Err(outcome) if outcome.is_not_ready() => {
                let mut state = self.state();
                if state.generation == generation {
                    state.pending = None;
                }
                Err(outcome)
            }
            Err(outcome) => {
                let should_lock = {
                    let mut state = self.state();
                    if state.generation != generation {
                        drop(state);
                        return Err(self.discard());
                    }
                    state.pending = None;
                    state.last_error = Some(outcome.clone());
                    if outcome.should_lock_session {
                        state.access = Access::Locked;
                    }
                    outcome.should_lock_session
                };
                if should_lock {
                    self.clear_marker().await;
                    tracing::warn!(
                        category = %outcome.category,
                        "Admin session locked after failed verification"
                    );
                }
                Err(outcome)
            }
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.state().generation != generation
    }

    fn discard(&self) -> ErrorOutcome {
        tracing::debug!("Discarding verification result from before lock");
        ErrorOutcome::locked()
    }

    async fn clear_marker(&self) {
        if let Err(e) = self.inner.store.clear().await {
            tracing::warn!(error = %e, "Could not clear admin marker");
        }
    }
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("AdminSession")
            .field("model", &self.inner.model)
            .field("caller", &self.inner.caller)
            .field("unlocked", &status.unlocked)
            .field("checking", &status.checking)
            .finish_non_exhaustive()
    }
}
