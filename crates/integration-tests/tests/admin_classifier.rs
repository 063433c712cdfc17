//! Failure classification as seen by the admin panel.

#![allow(clippy::unwrap_used)]

use jobcenter_admin::services::{ErrorCategory, ErrorClassifier, RuleError};
use jobcenter_integration_tests::{SERVICE_ID, UNAUTHORIZED_MESSAGE, classifier};

#[test]
fn stopped_service_messages_lock_and_name_the_service() {
    let classifier = classifier();

    for message in [
        "Canister gkorp-uqaaa-aaaab-qeptq-cai is stopped",
        "IC0508: canister is not running",
        "Reject code: 5, rejected",
        // Stopped wins over unauthorized when both appear
        "Unauthorized caller, canister is stopped",
    ] {
        let outcome = classifier.classify(message);
        assert_eq!(outcome.category, ErrorCategory::StoppedService, "{message}");
        assert!(outcome.should_lock_session);
        assert!(outcome.user_message.contains(SERVICE_ID));
    }
}

#[test]
fn unauthorized_messages_lock_with_fixed_text() {
    let classifier = classifier();

    for message in [
        "Unauthorized: Only admins can perform this action",
        "Only admins may delete posts",
        "Canister called `ic0.trap` with message: nope",
    ] {
        let outcome = classifier.classify(message);
        assert_eq!(outcome.category, ErrorCategory::Unauthorized, "{message}");
        assert!(outcome.should_lock_session);
        assert_eq!(outcome.user_message, UNAUTHORIZED_MESSAGE);
    }
}

#[test]
fn trap_with_admin_wording_is_unauthorized() {
    let outcome = classifier().classify("trap: Unauthorized: Only admins can do this");

    assert_eq!(outcome.category, ErrorCategory::Unauthorized);
    assert!(outcome.should_lock_session);
    assert_eq!(outcome.user_message, UNAUTHORIZED_MESSAGE);
}

#[test]
fn other_messages_are_generic_and_keep_the_session() {
    let classifier = classifier();

    let outcome = classifier.classify("Network timeout after 30s");
    assert_eq!(outcome.category, ErrorCategory::Generic);
    assert!(!outcome.should_lock_session);
    assert_eq!(outcome.user_message, "Network timeout after 30s");

    let outcome = classifier.classify("");
    assert_eq!(outcome.category, ErrorCategory::Generic);
    assert!(!outcome.should_lock_session);
    assert!(!outcome.user_message.is_empty());
}

#[test]
fn matching_is_case_sensitive() {
    let outcome = classifier().classify("unauthorized");
    assert_eq!(outcome.category, ErrorCategory::Generic);
}

#[test]
fn classification_is_deterministic() {
    let classifier = classifier();
    let message = "Reject code: 5";
    assert_eq!(classifier.classify(message), classifier.classify(message));
}

#[test]
fn yaml_rules_replace_the_defaults() {
    let yaml = r#"
rules:
  - category: unauthorized
    patterns: ["permission denied"]
    message: "Ask {service} for access."
"#;
    let classifier = ErrorClassifier::from_yaml(yaml, "jobs-backend").unwrap();

    let outcome = classifier.classify("permission denied for delete_post");
    assert_eq!(outcome.category, ErrorCategory::Unauthorized);
    assert_eq!(outcome.user_message, "Ask jobs-backend for access.");

    // The default triggers are gone
    let outcome = classifier.classify("canister is stopped");
    assert_eq!(outcome.category, ErrorCategory::Generic);
}

#[test]
fn invalid_yaml_rules_are_rejected() {
    let duplicate = r#"
rules:
  - category: unauthorized
    patterns: ["a"]
    message: "x"
  - category: unauthorized
    patterns: ["b"]
    message: "y"
"#;
    assert!(matches!(
        ErrorClassifier::from_yaml(duplicate, SERVICE_ID),
        Err(RuleError::DuplicateCategory(ErrorCategory::Unauthorized))
    ));

    let empty = r#"
rules:
  - category: stopped_service
    patterns: []
    message: "x"
"#;
    assert!(matches!(
        ErrorClassifier::from_yaml(empty, SERVICE_ID),
        Err(RuleError::EmptyPattern(ErrorCategory::StoppedService))
    ));
}
