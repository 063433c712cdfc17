//! Integration tests for the Job Center admin gate.
//!
//! Everything runs in-process against the scripted backend, so no server or
//! network is needed:
//!
//! ```bash
//! cargo test -p jobcenter-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `admin_session` - unlock/lock lifecycle, restore, concurrency
//! - `admin_classifier` - failure classification properties
//! - `admin_privileged` - the privileged-operation wrapper
//! - `admin_routes` - the HTTP gate

#![allow(clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use jobcenter_admin::backend::{BackendSlot, Caller, ScriptedBackend};
use jobcenter_admin::routes;
use jobcenter_admin::services::{AccessModel, AdminSession, ErrorClassifier};
use jobcenter_admin::state::AppState;
use jobcenter_admin::storage::MemoryMarkerStore;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

/// Service identifier used in stopped-service messages.
pub const SERVICE_ID: &str = "gkorp-uqaaa-aaaab-qeptq-cai";

/// Bearer token of the test admin.
pub const ADMIN_TOKEN: &str = "admin-identity-token";

/// The message shown after an authorization failure auto-locks the panel.
pub const UNAUTHORIZED_MESSAGE: &str =
    "Access denied. Admin privileges required. Please unlock the admin panel again.";

/// Classifier with the built-in rules.
#[must_use]
pub fn classifier() -> Arc<ErrorClassifier> {
    Arc::new(ErrorClassifier::with_defaults(SERVICE_ID))
}

/// Password access model.
#[must_use]
pub fn password_model(secret: &str) -> AccessModel {
    AccessModel::Password(SecretString::from(secret.to_owned()))
}

/// A scripted backend plus one browser tab's marker storage.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    pub backend: ScriptedBackend,
    pub store: MemoryMarkerStore,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh session over the shared storage, as if the app had been
    /// reloaded in the same tab.
    #[must_use]
    pub fn session(&self, model: AccessModel) -> AdminSession {
        self.session_with_slot(model, BackendSlot::ready(Arc::new(self.backend.clone())))
    }

    /// Like [`session`](Self::session) with an explicit backend slot.
    #[must_use]
    pub fn session_with_slot(&self, model: AccessModel, slot: BackendSlot) -> AdminSession {
        AdminSession::new(
            model,
            slot,
            classifier(),
            Arc::new(self.store.clone()),
            Caller::with_token(ADMIN_TOKEN),
        )
    }
}

/// The full HTTP app over `slot`.
#[must_use]
pub fn app(model: AccessModel, slot: BackendSlot) -> Router {
    let state = AppState::new(model, slot, ErrorClassifier::with_defaults(SERVICE_ID));
    routes::app(state, false)
}

/// Minimal browser: keeps the session cookie and sends a bearer token.
#[derive(Debug, Clone)]
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
    token: Option<String>,
}

impl TestClient {
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self {
            app,
            cookie: None,
            token: None,
        }
    }

    /// Send `Authorization: Bearer token` on every request.
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_owned());
        self
    }

    /// Forget the session cookie (new browsing session).
    pub fn clear_cookies(&mut self) {
        self.cookie = None;
    }

    /// Send a request and return the status and JSON body (`Null` if empty
    /// or not JSON).
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("infallible service");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.to_owned());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("readable body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }
}
