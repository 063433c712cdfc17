//! Privileged backend operations.
//!
//! Every admin-only backend call goes through [`AdminOperations::run`], which
//! applies one contract:
//!
//! 1. no backend yet: fail fast with "System not ready";
//! 2. session not unlocked: refuse with the locked outcome, no backend call;
//! 3. call the backend; on failure classify the message, auto-lock the
//!    session when the classification says so, and return the
//!    [`ErrorOutcome`] (never the raw backend error).
//!
//! Listings are cached for a few minutes and invalidated by the mutations
//! that change them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use jobcenter_core::{
    JobId, JobVacancy, NewJobVacancy, NewPost, Post, PostId, SearchableUserProfile,
};
use moka::future::Cache;
use tracing::instrument;

use super::classifier::ErrorOutcome;
use super::session::AdminSession;
use crate::backend::{AdminBackend, BackendError, Caller};

/// How long a listing stays cached without a mutation.
pub const LISTING_TTL: Duration = Duration::from_secs(300);

/// Cached vacancy and post listings, shared by all sessions.
#[derive(Clone)]
pub struct ListingCache {
    vacancies: Cache<(), Arc<Vec<JobVacancy>>>,
    posts: Cache<(), Arc<Vec<Post>>>,
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(LISTING_TTL)
    }
}

impl ListingCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            vacancies: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            posts: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Drop the cached vacancy listing.
    pub async fn invalidate_vacancies(&self) {
        self.vacancies.invalidate(&()).await;
    }

    /// Drop the cached post listing.
    pub async fn invalidate_posts(&self) {
        self.posts.invalidate(&()).await;
    }
}

impl std::fmt::Debug for ListingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingCache")
            .field("vacancies", &self.vacancies.entry_count())
            .field("posts", &self.posts.entry_count())
            .finish()
    }
}

/// Admin operations on behalf of one [`AdminSession`].
#[derive(Debug, Clone)]
pub struct AdminOperations {
    session: AdminSession,
    listings: ListingCache,
}

impl AdminOperations {
    #[must_use]
    pub const fn new(session: AdminSession, listings: ListingCache) -> Self {
        Self { session, listings }
    }

    #[must_use]
    pub const fn session(&self) -> &AdminSession {
        &self.session
    }

    /// Run one privileged backend call under the wrapper contract.
    ///
    /// # Errors
    ///
    /// Returns the not-ready outcome, the locked outcome, or the classified
    /// backend failure.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, ErrorOutcome>
    where
        F: FnOnce(Arc<dyn AdminBackend>, Caller) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let Some(backend) = self.session.backend().get() else {
            return Err(ErrorOutcome::not_ready());
        };

        let status = self.session.settle().await;
        if !status.unlocked {
            tracing::debug!(operation, "Refusing privileged operation on locked session");
            return Err(ErrorOutcome::locked());
        }

        match call(backend, self.session.caller().clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                let outcome = self.session.classifier().classify(e.message());
                tracing::warn!(
                    operation,
                    category = %outcome.category,
                    locks = outcome.should_lock_session,
                    "Privileged operation failed"
                );
                if outcome.should_lock_session {
                    self.session.lock_with_reason(outcome.clone()).await;
                }
                Err(outcome)
            }
        }
    }

    // =========================================================================
    // Listings (unprivileged reads)
    // =========================================================================

    /// All vacancies, from cache when fresh.
    ///
    /// Failures are classified but never lock the session.
    ///
    /// # Errors
    ///
    /// Returns the not-ready outcome or the classified backend failure.
    pub async fn list_job_vacancies(&self) -> Result<Arc<Vec<JobVacancy>>, ErrorOutcome> {
        let backend = self.session.backend().get().ok_or_else(ErrorOutcome::not_ready)?;
        self.listings
            .vacancies
            .try_get_with((), async move { backend.list_job_vacancies().await.map(Arc::new) })
            .await
            .map_err(|e| self.classify_read("list_job_vacancies", &e))
    }

    /// All posts, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the not-ready outcome or the classified backend failure.
    pub async fn list_posts(&self) -> Result<Arc<Vec<Post>>, ErrorOutcome> {
        let backend = self.session.backend().get().ok_or_else(ErrorOutcome::not_ready)?;
        self.listings
            .posts
            .try_get_with((), async move { backend.list_posts().await.map(Arc::new) })
            .await
            .map_err(|e| self.classify_read("list_posts", &e))
    }

    fn classify_read(&self, operation: &'static str, error: &BackendError) -> ErrorOutcome {
        let outcome = self.session.classifier().classify(error.message());
        tracing::warn!(operation, category = %outcome.category, "Listing failed");
        outcome
    }

    // =========================================================================
    // Vacancies
    // =========================================================================

    /// Publish a vacancy.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[instrument(skip(self, vacancy), fields(title = %vacancy.title))]
    pub async fn create_job_vacancy(&self, vacancy: &NewJobVacancy) -> Result<JobId, ErrorOutcome> {
        let id = self
            .run("create_job_vacancy", |backend, caller| async move {
                backend.create_job_vacancy(&caller, vacancy).await
            })
            .await?;
        self.listings.invalidate_vacancies().await;
        tracing::info!(job_id = %id, "Job vacancy created");
        Ok(id)
    }

    /// Replace a vacancy.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[instrument(skip(self, vacancy), fields(job_id = %id))]
    pub async fn update_job_vacancy(
        &self,
        id: JobId,
        vacancy: &NewJobVacancy,
    ) -> Result<(), ErrorOutcome> {
        self.run("update_job_vacancy", |backend, caller| async move {
            backend.update_job_vacancy(&caller, id, vacancy).await
        })
        .await?;
        self.listings.invalidate_vacancies().await;
        Ok(())
    }

    /// Remove a vacancy.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn delete_job_vacancy(&self, id: JobId) -> Result<(), ErrorOutcome> {
        self.run("delete_job_vacancy", |backend, caller| async move {
            backend.delete_job_vacancy(&caller, id).await
        })
        .await?;
        self.listings.invalidate_vacancies().await;
        tracing::info!("Job vacancy deleted");
        Ok(())
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Publish an announcement.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[instrument(skip(self, post), fields(title = %post.title))]
    pub async fn create_post(&self, post: &NewPost) -> Result<PostId, ErrorOutcome> {
        let id = self
            .run("create_post", |backend, caller| async move {
                backend.create_post(&caller, post).await
            })
            .await?;
        self.listings.invalidate_posts().await;
        tracing::info!(post_id = %id, "Post created");
        Ok(id)
    }

    /// Replace an announcement.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[instrument(skip(self, post), fields(post_id = %id))]
    pub async fn update_post(&self, id: PostId, post: &NewPost) -> Result<(), ErrorOutcome> {
        self.run("update_post", |backend, caller| async move {
            backend.update_post(&caller, id, post).await
        })
        .await?;
        self.listings.invalidate_posts().await;
        Ok(())
    }

    /// Remove an announcement.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn delete_post(&self, id: PostId) -> Result<(), ErrorOutcome> {
        self.run("delete_post", |backend, caller| async move {
            backend.delete_post(&caller, id).await
        })
        .await?;
        self.listings.invalidate_posts().await;
        tracing::info!("Post deleted");
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Search user profiles. A blank term lists everyone.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[instrument(skip(self))]
    pub async fn search_users(
        &self,
        term: Option<&str>,
    ) -> Result<Vec<SearchableUserProfile>, ErrorOutcome> {
        let term = term.map(str::trim).filter(|t| !t.is_empty());
        self.run("authorized_user_search", |backend, caller| async move {
            backend.authorized_user_search(&caller, term).await
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::{BackendSlot, NOT_ADMIN_MESSAGE, ScriptedBackend};
    use crate::services::classifier::{ErrorCategory, ErrorClassifier};
    use crate::services::session::AccessModel;
    use crate::storage::MemoryMarkerStore;

    fn vacancy(title: &str) -> NewJobVacancy {
        NewJobVacancy {
            title: title.to_owned(),
            description: "Front desk".to_owned(),
            requirements: vec!["SLC".to_owned()],
            salary_range: "NPR 25k".to_owned(),
        }
    }

    async fn unlocked(backend: &ScriptedBackend) -> AdminOperations {
        let session = AdminSession::new(
            AccessModel::Identity,
            BackendSlot::ready(Arc::new(backend.clone())),
            Arc::new(ErrorClassifier::with_defaults("backend")),
            Arc::new(MemoryMarkerStore::new()),
            Caller::with_token("admin-token"),
        );
        session.unlock("").await.unwrap();
        AdminOperations::new(session, ListingCache::default())
    }

    #[tokio::test]
    async fn test_locked_session_makes_no_call() {
        let backend = ScriptedBackend::new();
        let ops = unlocked(&backend).await;
        ops.session().lock().await;
        let before = backend.calls().len();

        let outcome = ops.create_job_vacancy(&vacancy("Clerk")).await.unwrap_err();
        assert_eq!(outcome, ErrorOutcome::locked());
        assert_eq!(backend.calls().len(), before);
    }

    #[tokio::test]
    async fn test_revoked_admin_auto_locks() {
        let backend = ScriptedBackend::new();
        let ops = unlocked(&backend).await;
        backend.set_admin(false);

        let outcome = ops.delete_post(PostId::new(1)).await.unwrap_err();
        assert_eq!(outcome.category, ErrorCategory::Unauthorized);
        assert!(outcome.should_lock_session);
        assert!(!ops.session().is_unlocked());
        assert_eq!(
            ops.session().status().last_error.as_deref(),
            Some("Access denied. Admin privileges required. Please unlock the admin panel again.")
        );
        assert!(NOT_ADMIN_MESSAGE.contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_generic_failure_keeps_session() {
        let backend = ScriptedBackend::new();
        let ops = unlocked(&backend).await;

        let outcome = ops.delete_job_vacancy(JobId::new(99)).await.unwrap_err();
        assert_eq!(outcome.category, ErrorCategory::Generic);
        assert_eq!(outcome.user_message, "Job vacancy 99 not found");
        assert!(ops.session().is_unlocked());
    }

    #[tokio::test]
    async fn test_mutation_invalidates_listing() {
        let backend = ScriptedBackend::new();
        let ops = unlocked(&backend).await;

        assert!(ops.list_job_vacancies().await.unwrap().is_empty());
        assert!(ops.list_job_vacancies().await.unwrap().is_empty());
        let listing_calls = || {
            backend
                .calls()
                .into_iter()
                .filter(|c| *c == "list_job_vacancies")
                .count()
        };
        assert_eq!(listing_calls(), 1);

        ops.create_job_vacancy(&vacancy("Driver")).await.unwrap();
        let listed = ops.list_job_vacancies().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listing_calls(), 2);
    }

    #[tokio::test]
    async fn test_listing_failure_does_not_lock() {
        let backend = ScriptedBackend::new();
        let ops = unlocked(&backend).await;
        backend.fail("list_posts", "Canister is stopped");

        let outcome = ops.list_posts().await.unwrap_err();
        assert_eq!(outcome.category, ErrorCategory::StoppedService);
        assert!(ops.session().is_unlocked());
    }

    #[tokio::test]
    async fn test_blank_search_term_lists_everyone() {
        let backend = ScriptedBackend::new();
        let ops = unlocked(&backend).await;
        assert!(ops.search_users(Some("   ")).await.unwrap().is_empty());
        assert_eq!(backend.calls().last(), Some(&"authorized_user_search"));
    }
}
