//! User search route handler.

use axum::{Json, extract::Query};
use jobcenter_core::SearchableUserProfile;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireUnlocked;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Name or email fragment; blank lists everyone.
    pub q: Option<String>,
}

/// Search user profiles (admin only on the backend too).
#[instrument(skip_all, fields(q = ?query.q))]
pub async fn search(
    RequireUnlocked(ops): RequireUnlocked,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchableUserProfile>>, AppError> {
    let profiles = ops.search_users(query.q.as_deref()).await?;
    Ok(Json(profiles))
}
