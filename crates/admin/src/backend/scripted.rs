//! In-memory backend with scripted answers, for tests.
//!
//! Privileged calls are rejected with the backend's own wording when the
//! scripted caller is not an admin, so revoking admin mid-session behaves the
//! way the real backend does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use jobcenter_core::{
    JobId, JobVacancy, NewJobVacancy, NewPost, Post, PostId, Principal, SearchableUserProfile,
    UserRole,
};
use tokio::sync::watch;

use super::{AdminBackend, BackendError, Caller};

/// Rejection text the backend uses for non-admin callers.
pub const NOT_ADMIN_MESSAGE: &str = "Unauthorized: Only admins can perform this action";

/// Backend double driven by test code.
#[derive(Clone)]
pub struct ScriptedBackend {
    inner: Arc<ScriptedInner>,
}

struct ScriptedInner {
    state: Mutex<ScriptState>,
    admin_checks: AtomicUsize,
    open: watch::Sender<bool>,
}

struct ScriptState {
    admin: bool,
    failures: HashMap<&'static str, String>,
    calls: Vec<&'static str>,
    vacancies: Vec<JobVacancy>,
    posts: Vec<Post>,
    profiles: Vec<SearchableUserProfile>,
    next_id: u64,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// A backend whose caller is an admin and that holds no data.
    #[must_use]
    pub fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            inner: Arc::new(ScriptedInner {
                state: Mutex::new(ScriptState {
                    admin: true,
                    failures: HashMap::new(),
                    calls: Vec::new(),
                    vacancies: Vec::new(),
                    posts: Vec::new(),
                    profiles: Vec::new(),
                    next_id: 1,
                }),
                admin_checks: AtomicUsize::new(0),
                open,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Set whether the caller holds the admin role.
    #[must_use]
    pub fn with_admin(self, admin: bool) -> Self {
        self.set_admin(admin);
        self
    }

    /// Seed a user profile for the search endpoint.
    #[must_use]
    pub fn with_profile(self, profile: SearchableUserProfile) -> Self {
        self.state().profiles.push(profile);
        self
    }

    /// Grant or revoke the admin role.
    pub fn set_admin(&self, admin: bool) {
        self.state().admin = admin;
    }

    /// Make every call to `method` fail with `message`.
    pub fn fail(&self, method: &'static str, message: impl Into<String>) {
        self.state().failures.insert(method, message.into());
    }

    /// Let `method` succeed again.
    pub fn recover(&self, method: &'static str) {
        self.state().failures.remove(method);
    }

    /// Hold every call until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.inner.open.send_replace(false);
    }

    /// Release held calls.
    pub fn resume(&self) {
        self.inner.open.send_replace(true);
    }

    /// How many admin-role checks have started.
    #[must_use]
    pub fn admin_checks(&self) -> usize {
        self.inner.admin_checks.load(Ordering::SeqCst)
    }

    /// Methods called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    /// Current vacancies.
    #[must_use]
    pub fn vacancies(&self) -> Vec<JobVacancy> {
        self.state().vacancies.clone()
    }

    /// Current posts.
    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        self.state().posts.clone()
    }

    async fn enter(&self, method: &'static str) -> Result<(), BackendError> {
        self.state().calls.push(method);
        let mut open = self.inner.open.subscribe();
        // The sender lives in `inner`, so the channel cannot close under us.
        let _ = open.wait_for(|open| *open).await;
        match self.state().failures.get(method) {
            Some(message) => Err(BackendError::new(message.clone())),
            None => Ok(()),
        }
    }

    async fn enter_privileged(&self, method: &'static str) -> Result<(), BackendError> {
        self.enter(method).await?;
        if self.state().admin {
            Ok(())
        } else {
            Err(BackendError::new(NOT_ADMIN_MESSAGE))
        }
    }

    fn not_found(kind: &str, id: impl std::fmt::Display) -> BackendError {
        BackendError::new(format!("{kind} {id} not found"))
    }
}

impl std::fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("admin_checks", &self.admin_checks())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AdminBackend for ScriptedBackend {
    async fn is_caller_admin(&self, _caller: &Caller) -> Result<bool, BackendError> {
        self.inner.admin_checks.fetch_add(1, Ordering::SeqCst);
        self.enter("is_caller_admin").await?;
        Ok(self.state().admin)
    }

    async fn caller_role(&self, _caller: &Caller) -> Result<UserRole, BackendError> {
        self.enter("caller_role").await?;
        Ok(if self.state().admin {
            UserRole::Admin
        } else {
            UserRole::User
        })
    }

    async fn list_job_vacancies(&self) -> Result<Vec<JobVacancy>, BackendError> {
        self.enter("list_job_vacancies").await?;
        Ok(self.vacancies())
    }

    async fn list_posts(&self) -> Result<Vec<Post>, BackendError> {
        self.enter("list_posts").await?;
        Ok(self.posts())
    }

    async fn create_job_vacancy(
        &self,
        _caller: &Caller,
        vacancy: &NewJobVacancy,
    ) -> Result<JobId, BackendError> {
        self.enter_privileged("create_job_vacancy").await?;
        let mut state = self.state();
        let id = JobId::new(state.next_id);
        state.next_id += 1;
        state.vacancies.push(JobVacancy {
            id,
            title: vacancy.title.clone(),
            description: vacancy.description.clone(),
            requirements: vacancy.requirements.clone(),
            salary_range: vacancy.salary_range.clone(),
            posted_at: Utc::now(),
        });
        Ok(id)
    }

    async fn update_job_vacancy(
        &self,
        _caller: &Caller,
        id: JobId,
        vacancy: &NewJobVacancy,
    ) -> Result<(), BackendError> {
        self.enter_privileged("update_job_vacancy").await?;
        let mut state = self.state();
        let existing = state
            .vacancies
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| Self::not_found("Job vacancy", id))?;
        existing.title.clone_from(&vacancy.title);
        existing.description.clone_from(&vacancy.description);
        existing.requirements.clone_from(&vacancy.requirements);
        existing.salary_range.clone_from(&vacancy.salary_range);
        Ok(())
    }

    async fn delete_job_vacancy(&self, _caller: &Caller, id: JobId) -> Result<(), BackendError> {
        self.enter_privileged("delete_job_vacancy").await?;
        let mut state = self.state();
        let before = state.vacancies.len();
        state.vacancies.retain(|v| v.id != id);
        if state.vacancies.len() == before {
            return Err(Self::not_found("Job vacancy", id));
        }
        Ok(())
    }

    async fn create_post(&self, _caller: &Caller, post: &NewPost) -> Result<PostId, BackendError> {
        self.enter_privileged("create_post").await?;
        let mut state = self.state();
        let id = PostId::new(state.next_id);
        state.next_id += 1;
        state.posts.push(Post {
            id,
            title: post.title.clone(),
            content: post.content.clone(),
            author: Principal::new("aaaaa-aa"),
            created_at: Utc::now(),
            image_url: post.image_url.clone(),
        });
        Ok(id)
    }

    async fn update_post(
        &self,
        _caller: &Caller,
        id: PostId,
        post: &NewPost,
    ) -> Result<(), BackendError> {
        self.enter_privileged("update_post").await?;
        let mut state = self.state();
        let existing = state
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found("Post", id))?;
        existing.title.clone_from(&post.title);
        existing.content.clone_from(&post.content);
        existing.image_url.clone_from(&post.image_url);
        Ok(())
    }

    async fn delete_post(&self, _caller: &Caller, id: PostId) -> Result<(), BackendError> {
        self.enter_privileged("delete_post").await?;
        let mut state = self.state();
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(Self::not_found("Post", id));
        }
        Ok(())
    }

    async fn authorized_user_search(
        &self,
        _caller: &Caller,
        term: Option<&str>,
    ) -> Result<Vec<SearchableUserProfile>, BackendError> {
        self.enter_privileged("authorized_user_search").await?;
        let needle = term.map(str::to_lowercase).unwrap_or_default();
        Ok(self
            .state()
            .profiles
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.display_name().to_lowercase().contains(&needle)
                    || p.email.as_str().to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}
