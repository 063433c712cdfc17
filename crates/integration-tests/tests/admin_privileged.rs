//! Privileged operations through the session-aware wrapper.

#![allow(clippy::unwrap_used)]

use jobcenter_admin::backend::{BackendSlot, NOT_ADMIN_MESSAGE, ScriptedBackend};
use jobcenter_admin::services::{
    AccessModel, AdminOperations, ErrorCategory, ErrorOutcome, ListingCache,
};
use jobcenter_admin::storage::{MemoryMarkerStore, UNLOCKED_KEY};
use jobcenter_core::{
    Email, JobId, NewJobVacancy, NewPost, PostId, Principal, SearchableUserProfile,
};
use jobcenter_integration_tests::{Harness, SERVICE_ID, UNAUTHORIZED_MESSAGE};

fn vacancy(title: &str) -> NewJobVacancy {
    NewJobVacancy {
        title: title.to_owned(),
        description: "Assist walk-in job seekers".to_owned(),
        requirements: vec!["Nepali".to_owned(), "English".to_owned()],
        salary_range: "NPR 30,000 - 40,000".to_owned(),
    }
}

fn post(title: &str) -> NewPost {
    NewPost {
        title: title.to_owned(),
        content: "Job fair this Friday".to_owned(),
        image_url: None,
    }
}

fn operations(harness: &Harness) -> AdminOperations {
    AdminOperations::new(harness.session(AccessModel::Identity), ListingCache::default())
}

async fn unlocked(harness: &Harness) -> AdminOperations {
    let ops = operations(harness);
    ops.session().unlock("").await.unwrap();
    ops
}

const OPERATIONS: usize = 7;

/// Privileged operation number `index`, with a fixed argument set.
async fn run_one(ops: &AdminOperations, index: usize) -> Result<(), ErrorOutcome> {
    match index {
        0 => ops.create_job_vacancy(&vacancy("Clerk")).await.map(|_| ()),
        1 => ops.update_job_vacancy(JobId::new(1), &vacancy("Clerk")).await,
        2 => ops.delete_job_vacancy(JobId::new(1)).await,
        3 => ops.create_post(&post("Fair")).await.map(|_| ()),
        4 => ops.update_post(PostId::new(2), &post("Fair")).await,
        5 => ops.delete_post(PostId::new(2)).await,
        _ => ops.search_users(None).await.map(|_| ()),
    }
}

async fn run_all(ops: &AdminOperations) -> Vec<Result<(), ErrorOutcome>> {
    let mut results = Vec::with_capacity(OPERATIONS);
    for index in 0..OPERATIONS {
        results.push(run_one(ops, index).await);
    }
    results
}

#[tokio::test]
async fn locked_session_makes_no_backend_calls() {
    let harness = Harness::new();
    let ops = operations(&harness);

    for result in run_all(&ops).await {
        assert_eq!(result, Err(ErrorOutcome::locked()));
    }
    assert!(harness.backend.calls().is_empty());
}

#[tokio::test]
async fn missing_backend_is_not_ready() {
    let harness = Harness::new();
    let session = harness.session_with_slot(AccessModel::Identity, BackendSlot::empty());
    let ops = AdminOperations::new(session, ListingCache::default());

    for result in run_all(&ops).await {
        assert!(result.unwrap_err().is_not_ready());
    }
    assert!(ops.list_posts().await.unwrap_err().is_not_ready());
}

#[tokio::test]
async fn unlocked_session_runs_every_operation() {
    let harness = Harness::new();
    let ops = unlocked(&harness).await;

    for result in run_all(&ops).await {
        assert_eq!(result, Ok(()));
    }
    assert_eq!(
        harness.backend.calls(),
        vec![
            "is_caller_admin",
            "create_job_vacancy",
            "update_job_vacancy",
            "delete_job_vacancy",
            "create_post",
            "update_post",
            "delete_post",
            "authorized_user_search",
        ]
    );
}

#[tokio::test]
async fn revoked_admin_locks_on_every_operation() {
    let harness = Harness::new();
    let ops = operations(&harness);

    for index in 0..OPERATIONS {
        harness.backend.set_admin(true);
        ops.session().unlock("").await.unwrap();
        harness.backend.set_admin(false);

        let outcome = run_one(&ops, index).await.unwrap_err();

        assert_eq!(outcome.category, ErrorCategory::Unauthorized, "operation {index}");
        assert!(outcome.should_lock_session);
        assert!(!ops.session().is_unlocked(), "operation {index}");
    }
}

#[tokio::test]
async fn unauthorized_rejection_clears_marker_and_explains() {
    let harness = Harness::new();
    let ops = unlocked(&harness).await;
    assert!(harness.store.entries().contains_key(UNLOCKED_KEY));
    harness.backend.set_admin(false);

    let result = ops.delete_post(PostId::new(42)).await;

    let outcome = result.unwrap_err();
    assert_eq!(outcome.category, ErrorCategory::Unauthorized);
    assert_eq!(outcome.user_message, UNAUTHORIZED_MESSAGE);

    let status = ops.session().status();
    assert!(!status.unlocked);
    assert_eq!(status.last_error.as_deref(), Some(UNAUTHORIZED_MESSAGE));
    assert!(harness.store.entries().is_empty());
}

#[tokio::test]
async fn stopped_service_locks_and_names_the_service() {
    let harness = Harness::new();
    let ops = unlocked(&harness).await;
    harness
        .backend
        .fail("create_post", "Canister gkorp-uqaaa-aaaab-qeptq-cai is stopped");

    let outcome = ops.create_post(&post("Fair")).await.unwrap_err();

    assert_eq!(outcome.category, ErrorCategory::StoppedService);
    assert!(outcome.user_message.contains(SERVICE_ID));
    assert!(!ops.session().is_unlocked());
    assert!(harness.backend.posts().is_empty());
}

#[tokio::test]
async fn generic_failure_keeps_the_session() {
    let harness = Harness::new();
    let ops = unlocked(&harness).await;
    harness
        .backend
        .fail("update_job_vacancy", "Job vacancy 9 not found");

    let outcome = ops
        .update_job_vacancy(JobId::new(9), &vacancy("Clerk"))
        .await
        .unwrap_err();

    assert_eq!(outcome.category, ErrorCategory::Generic);
    assert_eq!(outcome.user_message, "Job vacancy 9 not found");
    assert!(ops.session().is_unlocked());
    assert!(ops.session().last_error().is_none());
}

#[tokio::test]
async fn raw_backend_text_never_leaks_for_locking_failures() {
    let harness = Harness::new();
    let ops = unlocked(&harness).await;
    harness.backend.set_admin(false);

    let outcome = ops.create_job_vacancy(&vacancy("Clerk")).await.unwrap_err();

    assert_ne!(outcome.user_message, NOT_ADMIN_MESSAGE);
}

#[tokio::test]
async fn search_passes_trimmed_term() {
    let profile = SearchableUserProfile {
        principal: Principal::new("w3gef-eqbai"),
        first_name: "Sita".to_owned(),
        last_name: "Sharma".to_owned(),
        email: Email::parse("sita@example.com").unwrap(),
    };
    let harness = Harness {
        backend: ScriptedBackend::new().with_profile(profile.clone()),
        store: MemoryMarkerStore::new(),
    };
    let ops = unlocked(&harness).await;

    assert_eq!(
        ops.search_users(Some("  sita ")).await.unwrap(),
        vec![profile.clone()]
    );
    assert_eq!(ops.search_users(Some("ram")).await.unwrap(), Vec::new());
    assert_eq!(ops.search_users(Some("   ")).await.unwrap(), vec![profile]);
}

#[tokio::test]
async fn listings_are_cached_until_a_mutation() {
    let harness = Harness::new();
    let ops = unlocked(&harness).await;

    assert!(ops.list_job_vacancies().await.unwrap().is_empty());
    ops.create_job_vacancy(&vacancy("Clerk")).await.unwrap();
    let listed = ops.list_job_vacancies().await.unwrap();
    ops.list_job_vacancies().await.unwrap();

    assert_eq!(listed.len(), 1);
    let listings = harness
        .backend
        .calls()
        .into_iter()
        .filter(|call| *call == "list_job_vacancies")
        .count();
    assert_eq!(listings, 2);
}
