//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Backend client initialized
//!
//! # Gate
//! GET    /admin/status           - { unlocked, checking, lastError }
//! POST   /admin/unlock           - Unlock (password or identity check)
//! POST   /admin/lock             - Lock and forget the stored marker
//!
//! # Vacancies (unlocked only)
//! GET    /admin/vacancies        - Vacancy listing
//! POST   /admin/vacancies        - Create vacancy
//! PUT    /admin/vacancies/{id}   - Replace vacancy
//! DELETE /admin/vacancies/{id}   - Delete vacancy
//!
//! # Posts (unlocked only)
//! GET    /admin/posts            - Post listing
//! POST   /admin/posts            - Create post
//! PUT    /admin/posts/{id}       - Replace post
//! DELETE /admin/posts/{id}       - Delete post
//!
//! # Users (unlocked only)
//! GET    /admin/users/search?q=  - Search user profiles
//! ```

use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri},
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::middleware::create_session_layer;
use crate::state::AppState;

pub mod admin;
pub mod posts;
pub mod users;
pub mod vacancies;

/// All routes, without the session layer.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        // Gate
        .route("/admin/status", get(admin::status))
        .route("/admin/unlock", post(admin::unlock))
        .route("/admin/lock", post(admin::lock))
        // Vacancies
        .route(
            "/admin/vacancies",
            get(vacancies::index).post(vacancies::create),
        )
        .route(
            "/admin/vacancies/{id}",
            put(vacancies::update).delete(vacancies::delete),
        )
        // Posts
        .route("/admin/posts", get(posts::index).post(posts::create))
        .route("/admin/posts/{id}", put(posts::update).delete(posts::delete))
        // Users
        .route("/admin/users/search", get(users::search))
        .fallback(not_found)
}

/// The complete application: routes, session layer and state.
///
/// `secure_cookies` should be `true` when served over HTTPS.
pub fn app(state: AppState, secure_cookies: bool) -> Router {
    routes()
        .layer(create_session_layer(secure_cookies))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the backend client is initialized.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.backend().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

/// Reject a blank title before anything reaches the backend.
fn require_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    Ok(())
}
