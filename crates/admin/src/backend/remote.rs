//! HTTP client for the job-board backend's JSON RPC surface.
//!
//! Every method is `POST {base}/rpc/{method}` with a JSON argument object and
//! the caller's bearer token. A non-2xx response is a failure whose message is
//! the response body, which is where the backend puts its rejection text
//! (e.g. "Unauthorized: admin only" or a stopped-canister report).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobcenter_core::{
    JobId, JobVacancy, NewJobVacancy, NewPost, Post, PostId, SearchableUserProfile, UserRole,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;

use super::{AdminBackend, BackendError, Caller};

/// Backend client over HTTP.
#[derive(Clone)]
pub struct RemoteBackend {
    inner: Arc<RemoteInner>,
}

struct RemoteInner {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteBackend {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(RemoteInner { client, base_url }),
        })
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| BackendError::new(format!("Invalid backend URL: {e}")))
    }

    /// Check that the backend answers its health endpoint.
    ///
    /// # Errors
    ///
    /// Returns the transport error or the non-2xx response body.
    #[instrument(skip(self), fields(base_url = %self.inner.base_url))]
    pub async fn probe(&self) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("health")?)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::new(if body.is_empty() {
            format!("Backend health check failed: {status}")
        } else {
            body
        }))
    }

    #[instrument(skip(self, caller, args))]
    async fn call<A, T>(&self, method: &str, caller: &Caller, args: &A) -> Result<T, BackendError>
    where
        A: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .inner
            .client
            .post(self.endpoint(&format!("rpc/{method}"))?)
            .json(args);
        if let Some(token) = caller.token() {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(method, %status, "Backend call rejected");
            return Err(BackendError::new(if body.trim().is_empty() {
                format!("Backend returned {status}")
            } else {
                body
            }));
        }

        let value: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)
                .map_err(|e| BackendError::new(format!("Invalid backend response: {e}")))?
        };
        serde_json::from_value(value)
            .map_err(|e| BackendError::new(format!("Unexpected backend response: {e}")))
    }
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AdminBackend for RemoteBackend {
    async fn is_caller_admin(&self, caller: &Caller) -> Result<bool, BackendError> {
        self.call("is_caller_admin", caller, &json!({})).await
    }

    async fn caller_role(&self, caller: &Caller) -> Result<UserRole, BackendError> {
        self.call("get_caller_role", caller, &json!({})).await
    }

    async fn list_job_vacancies(&self) -> Result<Vec<JobVacancy>, BackendError> {
        self.call("get_all_job_vacancies", &Caller::anonymous(), &json!({}))
            .await
    }

    async fn list_posts(&self) -> Result<Vec<Post>, BackendError> {
        self.call("get_all_posts", &Caller::anonymous(), &json!({}))
            .await
    }

    async fn create_job_vacancy(
        &self,
        caller: &Caller,
        vacancy: &NewJobVacancy,
    ) -> Result<JobId, BackendError> {
        self.call("create_job_vacancy", caller, vacancy).await
    }

    async fn update_job_vacancy(
        &self,
        caller: &Caller,
        id: JobId,
        vacancy: &NewJobVacancy,
    ) -> Result<(), BackendError> {
        self.call(
            "update_job_vacancy",
            caller,
            &json!({ "id": id, "vacancy": vacancy }),
        )
        .await
    }

    async fn delete_job_vacancy(&self, caller: &Caller, id: JobId) -> Result<(), BackendError> {
        self.call("delete_job_vacancy", caller, &json!({ "id": id }))
            .await
    }

    async fn create_post(&self, caller: &Caller, post: &NewPost) -> Result<PostId, BackendError> {
        self.call("create_post", caller, post).await
    }

    async fn update_post(
        &self,
        caller: &Caller,
        id: PostId,
        post: &NewPost,
    ) -> Result<(), BackendError> {
        self.call("update_post", caller, &json!({ "id": id, "post": post }))
            .await
    }

    async fn delete_post(&self, caller: &Caller, id: PostId) -> Result<(), BackendError> {
        self.call("delete_post", caller, &json!({ "id": id })).await
    }

    async fn authorized_user_search(
        &self,
        caller: &Caller,
        term: Option<&str>,
    ) -> Result<Vec<SearchableUserProfile>, BackendError> {
        self.call("authorized_user_search", caller, &json!({ "term": term }))
            .await
    }
}
