//! Job vacancy route handlers.

use axum::{Json, extract::Path, http::StatusCode};
use jobcenter_core::{JobId, JobVacancy, NewJobVacancy};
use serde_json::{Value, json};

use super::require_title;
use crate::error::AppError;
use crate::middleware::RequireUnlocked;

/// Vacancy listing.
pub async fn index(
    RequireUnlocked(ops): RequireUnlocked,
) -> Result<Json<Vec<JobVacancy>>, AppError> {
    let vacancies = ops.list_job_vacancies().await?;
    Ok(Json(Vec::clone(&vacancies)))
}

/// Publish a vacancy.
pub async fn create(
    RequireUnlocked(ops): RequireUnlocked,
    Json(vacancy): Json<NewJobVacancy>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_title(&vacancy.title)?;
    let id = ops.create_job_vacancy(&vacancy).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Replace a vacancy.
pub async fn update(
    RequireUnlocked(ops): RequireUnlocked,
    Path(id): Path<JobId>,
    Json(vacancy): Json<NewJobVacancy>,
) -> Result<StatusCode, AppError> {
    require_title(&vacancy.title)?;
    ops.update_job_vacancy(id, &vacancy).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a vacancy.
pub async fn delete(
    RequireUnlocked(ops): RequireUnlocked,
    Path(id): Path<JobId>,
) -> Result<StatusCode, AppError> {
    ops.delete_job_vacancy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
