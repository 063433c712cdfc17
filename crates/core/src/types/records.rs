//! Records exchanged with the job-board backend.
//!
//! Field names are camelCase on the wire to match the backend's JSON
//! interface. Timestamps are assigned by the backend; inputs never carry them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Email, JobId, PostId, Principal};

/// A published job vacancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobVacancy {
    pub id: JobId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub salary_range: String,
    pub posted_at: DateTime<Utc>,
}

/// Admin input for creating or replacing a vacancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJobVacancy {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub salary_range: String,
}

/// An announcement shown on the job seekers' updates page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: Principal,
    pub created_at: DateTime<Utc>,
    /// Direct URL of the attached image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Admin input for creating or replacing a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A user profile as returned by the admin-only user search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchableUserProfile {
    pub principal: Principal,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
}

impl SearchableUserProfile {
    /// "First Last", trimmed.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}
