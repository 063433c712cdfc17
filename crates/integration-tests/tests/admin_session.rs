//! Admin session lifecycle: unlock, lock, restore and concurrent checks.

#![allow(clippy::unwrap_used)]

use jobcenter_admin::backend::BackendSlot;
use jobcenter_admin::services::{AccessModel, AdminStatus, ErrorOutcome, Verification};
use jobcenter_admin::storage::{CREDENTIAL_KEY, UNLOCKED_KEY};
use jobcenter_core::UserRole;
use jobcenter_integration_tests::{Harness, password_model};

const SECRET: &str = "correct-horse-battery-staple";

async fn until_admin_check_started(harness: &Harness, count: usize) {
    while harness.backend.admin_checks() < count {
        tokio::task::yield_now().await;
    }
    tokio::task::yield_now().await;
}

// =============================================================================
// Lock
// =============================================================================

#[tokio::test]
async fn lock_is_idempotent() {
    let harness = Harness::new();
    let session = harness.session(AccessModel::Identity);

    session.unlock("").await.unwrap();
    assert!(session.is_unlocked());

    session.lock().await;
    let once = session.status();
    session.lock().await;
    let twice = session.status();

    assert_eq!(once, twice);
    assert_eq!(
        twice,
        AdminStatus {
            unlocked: false,
            checking: false,
            last_error: None,
        }
    );
    assert!(harness.store.entries().is_empty());
}

#[tokio::test]
async fn lock_on_fresh_session_stays_locked() {
    let harness = Harness::new();
    let session = harness.session(AccessModel::Identity);

    session.lock().await;
    session.lock().await;

    assert!(!session.is_unlocked());
    assert!(harness.backend.calls().is_empty());
}

// =============================================================================
// Password model
// =============================================================================

#[tokio::test]
async fn password_unlock_survives_reload_without_backend() {
    let harness = Harness::new();
    let first = harness.session(password_model(SECRET));
    first.unlock(SECRET).await.unwrap();
    assert_eq!(
        harness.store.entries().get(CREDENTIAL_KEY).map(String::as_str),
        Some(SECRET)
    );

    // Reload with no backend client at all
    let reloaded = harness.session_with_slot(password_model(SECRET), BackendSlot::empty());
    reloaded.restore().await;

    assert!(reloaded.is_unlocked());
    assert!(!reloaded.is_checking());
    assert!(harness.backend.calls().is_empty());
}

#[tokio::test]
async fn wrong_password_leaves_everything_untouched() {
    let harness = Harness::new();
    let session = harness.session(password_model("@rewan10"));

    let result = session.unlock("wrong").await;

    assert_eq!(result, Err(ErrorOutcome::incorrect_credential()));
    assert!(!session.is_unlocked());
    assert_eq!(harness.store.writes(), 0);
    assert!(harness.store.entries().is_empty());
}

#[tokio::test]
async fn changed_password_invalidates_stored_credential() {
    let harness = Harness::new();
    harness
        .session(password_model(SECRET))
        .unlock(SECRET)
        .await
        .unwrap();

    let rotated = harness.session(password_model("a-completely-new-secret"));
    rotated.restore().await;

    assert!(!rotated.is_unlocked());
    assert!(harness.store.entries().is_empty());
}

// =============================================================================
// Identity model
// =============================================================================

#[tokio::test]
async fn verify_success_unlocks_and_persists_flag() {
    let harness = Harness::new();
    let session = harness.session(AccessModel::Identity);

    let result = session.verify().await;

    assert_eq!(result, Ok(Verification::Granted));
    assert_eq!(
        session.status(),
        AdminStatus {
            unlocked: true,
            checking: false,
            last_error: None,
        }
    );
    assert_eq!(session.granted_role(), Some(UserRole::Admin));
    assert_eq!(
        harness.store.entries().get(UNLOCKED_KEY).map(String::as_str),
        Some("true")
    );
}

#[tokio::test]
async fn non_admin_is_denied_without_error() {
    let harness = Harness::new();
    harness.backend.set_admin(false);
    let session = harness.session(AccessModel::Identity);

    assert_eq!(session.verify().await, Ok(Verification::Denied));
    assert!(!session.is_unlocked());
    assert!(session.last_error().is_none());

    assert_eq!(
        session.unlock("").await,
        Err(ErrorOutcome::access_denied())
    );
}

#[tokio::test]
async fn restore_schedules_exactly_one_check() {
    let harness = Harness::new();
    harness
        .session(AccessModel::Identity)
        .unlock("")
        .await
        .unwrap();
    let before = harness.backend.admin_checks();

    let reloaded = harness.session(AccessModel::Identity);
    reloaded.restore().await;
    reloaded.restore().await;
    assert!(reloaded.is_checking());
    assert!(!reloaded.status().is_open());

    let status = reloaded.settle().await;

    assert!(status.unlocked);
    assert!(!status.checking);
    assert_eq!(harness.backend.admin_checks(), before + 1);
}

#[tokio::test]
async fn restore_after_revocation_locks() {
    let harness = Harness::new();
    harness
        .session(AccessModel::Identity)
        .unlock("")
        .await
        .unwrap();
    harness.backend.set_admin(false);

    let reloaded = harness.session(AccessModel::Identity);
    reloaded.restore().await;
    let status = reloaded.settle().await;

    assert!(!status.unlocked);
    assert!(status.last_error.is_none());
    assert!(harness.store.entries().is_empty());
}

#[tokio::test]
async fn concurrent_verifications_share_one_backend_call() {
    let harness = Harness::new();
    let session = harness.session(AccessModel::Identity);
    harness.backend.pause();

    let release = async {
        until_admin_check_started(&harness, 1).await;
        assert!(session.is_checking());
        harness.backend.resume();
    };
    let (first, second, ()) = tokio::join!(session.verify(), session.verify(), release);

    assert_eq!(first, Ok(Verification::Granted));
    assert_eq!(first, second);
    assert_eq!(harness.backend.admin_checks(), 1);
    assert!(session.is_unlocked());
}

#[tokio::test]
async fn concurrent_failures_are_shared_too() {
    let harness = Harness::new();
    harness
        .backend
        .fail("is_caller_admin", "IC0508: canister is stopped");
    let session = harness.session(AccessModel::Identity);
    harness.backend.pause();

    let release = async {
        until_admin_check_started(&harness, 1).await;
        harness.backend.resume();
    };
    let (first, second, ()) = tokio::join!(session.verify(), session.verify(), release);

    let outcome = first.unwrap_err();
    assert!(outcome.should_lock_session);
    assert_eq!(second, Err(outcome));
    assert_eq!(harness.backend.admin_checks(), 1);
}

#[tokio::test]
async fn lock_during_verification_wins() {
    let harness = Harness::new();
    let session = harness.session(AccessModel::Identity);
    harness.backend.pause();

    let lock_then_release = async {
        until_admin_check_started(&harness, 1).await;
        session.lock().await;
        harness.backend.resume();
    };
    let (result, ()) = tokio::join!(session.verify(), lock_then_release);

    assert_eq!(result, Err(ErrorOutcome::locked()));
    assert!(!session.is_unlocked());
    assert!(!session.is_checking());
    assert!(harness.store.entries().is_empty());
}

#[tokio::test]
async fn identity_unlock_fails_fast_without_backend() {
    let harness = Harness::new();
    let session = harness.session_with_slot(AccessModel::Identity, BackendSlot::empty());

    let result = session.unlock("").await;

    assert!(result.unwrap_err().is_not_ready());
    assert!(!session.is_checking());
    assert!(harness.backend.calls().is_empty());
}

#[tokio::test]
async fn backend_failure_with_not_ready_text_is_recorded() {
    let harness = Harness::new();
    harness
        .backend
        .fail("is_caller_admin", "System not ready. Please try again.");
    let session = harness.session(AccessModel::Identity);

    let outcome = session.verify().await.unwrap_err();

    assert!(!outcome.is_not_ready());
    assert_eq!(
        session.last_error().map(|e| e.user_message),
        Some("System not ready. Please try again.".to_owned())
    );
    assert!(!session.is_checking());
}
