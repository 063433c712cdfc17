//! Application state shared across handlers.

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::{BackendSlot, Caller};
use crate::middleware::{SESSION_IDLE, SessionRegistry};
use crate::services::{AccessModel, AdminOperations, AdminSession, ErrorClassifier, ListingCache};
use crate::storage::ScopedMarkers;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    access_model: AccessModel,
    backend: BackendSlot,
    classifier: Arc<ErrorClassifier>,
    markers: ScopedMarkers,
    sessions: SessionRegistry,
    listings: ListingCache,
}

impl AppState {
    /// Build state around a backend slot that may still be empty.
    #[must_use]
    pub fn new(access_model: AccessModel, backend: BackendSlot, classifier: ErrorClassifier) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                access_model,
                backend,
                classifier: Arc::new(classifier),
                markers: ScopedMarkers::new(SESSION_IDLE),
                sessions: SessionRegistry::new(SESSION_IDLE),
                listings: ListingCache::default(),
            }),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &BackendSlot {
        &self.inner.backend
    }

    #[must_use]
    pub fn access_model(&self) -> &AccessModel {
        &self.inner.access_model
    }

    #[must_use]
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.inner.classifier
    }

    /// The admin session for one browsing session and caller identity,
    /// restored from its marker the first time it is seen.
    pub async fn session_for(&self, gate: Uuid, caller: Caller) -> AdminSession {
        self.inner
            .sessions
            .get_or_restore(gate, caller, |caller| {
                AdminSession::new(
                    self.inner.access_model.clone(),
                    self.inner.backend.clone(),
                    Arc::clone(&self.inner.classifier),
                    Arc::new(self.inner.markers.for_gate(gate)),
                    caller,
                )
            })
            .await
    }

    /// Privileged operations bound to `session`.
    #[must_use]
    pub fn operations(&self, session: AdminSession) -> AdminOperations {
        AdminOperations::new(session, self.inner.listings.clone())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("access_model", &self.inner.access_model)
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}
