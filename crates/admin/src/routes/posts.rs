//! Announcement route handlers.

use axum::{Json, extract::Path, http::StatusCode};
use jobcenter_core::{NewPost, Post, PostId};
use serde_json::{Value, json};

use super::require_title;
use crate::error::AppError;
use crate::middleware::RequireUnlocked;

pub async fn index(RequireUnlocked(ops): RequireUnlocked) -> Result<Json<Vec<Post>>, AppError> {
    let posts = ops.list_posts().await?;
    Ok(Json(Vec::clone(&posts)))
}

pub async fn create(
    RequireUnlocked(ops): RequireUnlocked,
    Json(post): Json<NewPost>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_title(&post.title)?;
    let id = ops.create_post(&post).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update(
    RequireUnlocked(ops): RequireUnlocked,
    Path(id): Path<PostId>,
    Json(post): Json<NewPost>,
) -> Result<StatusCode, AppError> {
    require_title(&post.title)?;
    ops.update_post(id, &post).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    RequireUnlocked(ops): RequireUnlocked,
    Path(id): Path<PostId>,
) -> Result<StatusCode, AppError> {
    ops.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
