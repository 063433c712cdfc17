//! Backend failure classification.
//!
//! The backend gives us nothing but a message string when a call fails. This
//! module turns that string into an [`ErrorOutcome`]: what to tell the admin,
//! and whether the admin session has to be locked again.
//!
//! Classification is driven by an ordered rule table. The first rule with a
//! pattern contained in the message wins (case-sensitive substring match).
//! Messages matching no rule fall through to [`ErrorCategory::Generic`].
//!
//! The table can be replaced with a YAML file so trigger strings can be
//! adjusted without a rebuild:
//!
//! ```yaml
//! fallback_message: "An unexpected error occurred. Please try again."
//! rules:
//!   - category: stopped_service
//!     patterns: ["is stopped", "IC0508", "Reject code: 5"]
//!     message: "The backend service ({service}) is currently stopped. ..."
//!   - category: unauthorized
//!     patterns: ["Unauthorized", "Only admins", "trap"]
//!     message: "Access denied. Admin privileges required. Please unlock the admin panel again."
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder replaced by the remote service identifier in rule messages.
pub const SERVICE_PLACEHOLDER: &str = "{service}";

const STOPPED_SERVICE_MESSAGE: &str = "The backend service ({service}) is currently stopped. \
     Please restart or redeploy it, then refresh this page and try again.";
const UNAUTHORIZED_MESSAGE: &str =
    "Access denied. Admin privileges required. Please unlock the admin panel again.";
const FALLBACK_MESSAGE: &str = "An unexpected error occurred. Please try again.";
const NOT_READY_MESSAGE: &str = "System not ready. Please try again.";
const INCORRECT_CREDENTIAL_MESSAGE: &str = "Incorrect password. Please try again.";
const ACCESS_DENIED_MESSAGE: &str = "Access denied. Admin privileges required.";
const LOCKED_MESSAGE: &str = "The admin panel is locked. Please unlock it to continue.";

/// Broad class of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The remote service is administratively stopped. Operator-fixable.
    StoppedService,
    /// The caller lacks admin privileges (revoked role or expired session).
    Unauthorized,
    /// Anything else: network blips, bad input, unexpected backend faults.
    Generic,
}

impl ErrorCategory {
    /// Whether failures of this category invalidate an unlocked session.
    #[must_use]
    pub const fn locks_session(self) -> bool {
        matches!(self, Self::StoppedService | Self::Unauthorized)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoppedService => write!(f, "stopped_service"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// Where an [`ErrorOutcome`] came from.
///
/// Outcomes produced by the admin core itself are told apart by kind, never
/// by message text, so a backend failure cannot pose as one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// Classified from a backend failure message.
    Classified,
    /// No backend client yet.
    NotReady,
    /// Submitted password did not match.
    IncorrectCredential,
    /// The backend says the caller is not an admin.
    AccessDenied,
    /// Privileged operation on a locked session.
    Locked,
}

/// Structured result of interpreting a failure.
///
/// This is the only error shape that leaves the admin core; raw backend
/// messages never reach callers except as the `Generic` user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{user_message}")]
pub struct ErrorOutcome {
    /// Human-readable explanation.
    pub user_message: String,
    /// Whether the caller must force the admin session back to locked.
    pub should_lock_session: bool,
    /// Failure class.
    pub category: ErrorCategory,
    #[serde(skip)]
    kind: OutcomeKind,
}

impl ErrorOutcome {
    fn new(kind: OutcomeKind, category: ErrorCategory, user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            should_lock_session: category.locks_session(),
            category,
            kind,
        }
    }

    fn classified(category: ErrorCategory, user_message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Classified, category, user_message)
    }

    /// A failure that leaves session state alone.
    #[must_use]
    pub fn generic(user_message: impl Into<String>) -> Self {
        Self::classified(ErrorCategory::Generic, user_message)
    }

    /// The backend client has not been initialized yet.
    #[must_use]
    pub fn not_ready() -> Self {
        Self::new(OutcomeKind::NotReady, ErrorCategory::Generic, NOT_READY_MESSAGE)
    }

    /// A submitted admin password did not match.
    #[must_use]
    pub fn incorrect_credential() -> Self {
        Self::new(
            OutcomeKind::IncorrectCredential,
            ErrorCategory::Generic,
            INCORRECT_CREDENTIAL_MESSAGE,
        )
    }

    /// The backend answered that the caller is not an admin.
    #[must_use]
    pub fn access_denied() -> Self {
        Self::new(
            OutcomeKind::AccessDenied,
            ErrorCategory::Unauthorized,
            ACCESS_DENIED_MESSAGE,
        )
    }

    /// A privileged operation was attempted while the session is locked.
    #[must_use]
    pub fn locked() -> Self {
        Self::new(OutcomeKind::Locked, ErrorCategory::Unauthorized, LOCKED_MESSAGE)
    }

    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Whether this is the "system not ready" outcome.
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self.kind, OutcomeKind::NotReady)
    }

    /// Whether an unlock attempt was refused (wrong password, not an admin),
    /// as opposed to failing.
    #[must_use]
    pub const fn is_rejected_unlock(&self) -> bool {
        matches!(
            self.kind,
            OutcomeKind::IncorrectCredential | OutcomeKind::AccessDenied
        )
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Category assigned when any pattern matches.
    pub category: ErrorCategory,
    /// Substrings searched for in the failure message.
    pub patterns: Vec<String>,
    /// User message. May contain `{service}`.
    pub message: String,
}

/// A complete, ordered rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rules in priority order.
    pub rules: Vec<ClassificationRule>,
    /// Message for `Generic` failures with an empty message.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_fallback_message() -> String {
    FALLBACK_MESSAGE.to_owned()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassificationRule {
                    category: ErrorCategory::StoppedService,
                    patterns: vec![
                        "is stopped".to_owned(),
                        "IC0508".to_owned(),
                        "Reject code: 5".to_owned(),
                    ],
                    message: STOPPED_SERVICE_MESSAGE.to_owned(),
                },
                ClassificationRule {
                    category: ErrorCategory::Unauthorized,
                    patterns: vec![
                        "Unauthorized".to_owned(),
                        "Only admins".to_owned(),
                        "trap".to_owned(),
                    ],
                    message: UNAUTHORIZED_MESSAGE.to_owned(),
                },
            ],
            fallback_message: default_fallback_message(),
        }
    }
}

/// Errors from loading or validating a rule table.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule has no patterns, or an empty pattern.
    #[error("rule for {0} has an empty pattern list or an empty pattern")]
    EmptyPattern(ErrorCategory),

    /// The same category appears in two rules.
    #[error("more than one rule for {0}")]
    DuplicateCategory(ErrorCategory),

    /// `Generic` is the fallback and cannot be matched by pattern.
    #[error("generic is the fallback category and cannot have a rule")]
    GenericRule,

    /// Rule file could not be read.
    #[error("could not read rule file: {0}")]
    Io(#[from] std::io::Error),

    /// Rule file is not valid YAML for a rule table.
    #[error("invalid rule file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Maps raw backend failure messages to [`ErrorOutcome`]s.
///
/// Pure and deterministic: the same message always yields the same outcome.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
    fallback_message: String,
    service_id: String,
}

impl ErrorClassifier {
    /// Build a classifier from a rule table.
    ///
    /// `{service}` in rule messages is replaced with `service_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the table has empty patterns, a rule for
    /// `Generic`, or two rules for the same category.
    pub fn new(rule_set: RuleSet, service_id: &str) -> Result<Self, RuleError> {
        let mut seen = Vec::with_capacity(rule_set.rules.len());
        for rule in &rule_set.rules {
            if rule.category == ErrorCategory::Generic {
                return Err(RuleError::GenericRule);
            }
            if rule.patterns.is_empty() || rule.patterns.iter().any(String::is_empty) {
                return Err(RuleError::EmptyPattern(rule.category));
            }
            if seen.contains(&rule.category) {
                return Err(RuleError::DuplicateCategory(rule.category));
            }
            seen.push(rule.category);
        }

        Ok(Self::with_rules(rule_set, service_id))
    }

    /// Classifier with the built-in rule table.
    #[must_use]
    pub fn with_defaults(service_id: &str) -> Self {
        Self::with_rules(RuleSet::default(), service_id)
    }

    /// Substitute `{service}` into an already validated table.
    fn with_rules(rule_set: RuleSet, service_id: &str) -> Self {
        let rules = rule_set
            .rules
            .into_iter()
            .map(|mut rule| {
                rule.message = rule.message.replace(SERVICE_PLACEHOLDER, service_id);
                rule
            })
            .collect();
        Self {
            rules,
            fallback_message: rule_set.fallback_message,
            service_id: service_id.to_owned(),
        }
    }

    /// Parse and validate a YAML rule table.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] on invalid YAML or an invalid table.
    pub fn from_yaml(yaml: &str, service_id: &str) -> Result<Self, RuleError> {
        let rule_set: RuleSet = serde_yaml::from_str(yaml)?;
        Self::new(rule_set, service_id)
    }

    /// Load a YAML rule table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the file cannot be read or is invalid.
    pub fn from_yaml_file(path: &Path, service_id: &str) -> Result<Self, RuleError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml, service_id)
    }

    /// Interpret a raw failure message.
    #[must_use]
    pub fn classify(&self, message: &str) -> ErrorOutcome {
        let matched = self.rules.iter().find(|rule| {
            rule.patterns
                .iter()
                .any(|pattern| message.contains(pattern.as_str()))
        });

        match matched {
            Some(rule) => ErrorOutcome::classified(rule.category, rule.message.clone()),
            None if message.is_empty() => ErrorOutcome::generic(self.fallback_message.clone()),
            None => ErrorOutcome::generic(message),
        }
    }

    /// The effective rules, with `{service}` already substituted.
    #[must_use]
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// The remote service identifier named in stopped-service messages.
    #[must_use]
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// The effective table, for display.
    #[must_use]
    pub fn to_rule_set(&self) -> RuleSet {
        RuleSet {
            rules: self.rules.clone(),
            fallback_message: self.fallback_message.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SERVICE: &str = "gkorp-uqaaa-aaaab-qeptq-cai";

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::with_defaults(SERVICE)
    }

    #[test]
    fn test_stopped_service_markers() {
        for message in [
            "Canister gkorp-uqaaa-aaaab-qeptq-cai is stopped",
            "IC0508: canister stopped",
            "Call was rejected: Reject code: 5, Reject text: ...",
        ] {
            let outcome = classifier().classify(message);
            assert_eq!(outcome.category, ErrorCategory::StoppedService, "{message}");
            assert!(outcome.should_lock_session);
            assert!(outcome.user_message.contains(SERVICE));
            assert!(outcome.user_message.contains("restart or redeploy"));
        }
    }

    #[test]
    fn test_stopped_wins_over_unauthorized() {
        let outcome = classifier().classify("trap: canister is stopped; Unauthorized");
        assert_eq!(outcome.category, ErrorCategory::StoppedService);
    }

    #[test]
    fn test_unauthorized_markers() {
        let outcome = classifier().classify("trap: Unauthorized: Only admins can do this");
        assert_eq!(outcome.category, ErrorCategory::Unauthorized);
        assert!(outcome.should_lock_session);
        assert_eq!(
            outcome.user_message,
            "Access denied. Admin privileges required. Please unlock the admin panel again."
        );

        assert_eq!(
            classifier().classify("Only admins can delete posts").category,
            ErrorCategory::Unauthorized
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let outcome = classifier().classify("unauthorized request");
        assert_eq!(outcome.category, ErrorCategory::Generic);
        assert_eq!(outcome.user_message, "unauthorized request");
    }

    #[test]
    fn test_generic_passes_message_through() {
        let outcome = classifier().classify("network timeout");
        assert_eq!(outcome.category, ErrorCategory::Generic);
        assert!(!outcome.should_lock_session);
        assert_eq!(outcome.user_message, "network timeout");
    }

    #[test]
    fn test_generic_empty_message_uses_fallback() {
        let outcome = classifier().classify("");
        assert_eq!(outcome.category, ErrorCategory::Generic);
        assert_eq!(
            outcome.user_message,
            "An unexpected error occurred. Please try again."
        );
    }

    #[test]
    fn test_yaml_rules_replace_defaults() {
        let yaml = r#"
rules:
  - category: unauthorized
    patterns: ["403"]
    message: "Denied by {service}"
"#;
        let classifier = ErrorClassifier::from_yaml(yaml, "jobs-api").unwrap();
        let outcome = classifier.classify("HTTP 403");
        assert_eq!(outcome.category, ErrorCategory::Unauthorized);
        assert_eq!(outcome.user_message, "Denied by jobs-api");
        // Default triggers are gone.
        assert_eq!(
            classifier.classify("Unauthorized").category,
            ErrorCategory::Generic
        );
    }

    #[test]
    fn test_rule_validation() {
        let generic = RuleSet {
            rules: vec![ClassificationRule {
                category: ErrorCategory::Generic,
                patterns: vec!["x".to_owned()],
                message: "x".to_owned(),
            }],
            fallback_message: default_fallback_message(),
        };
        assert!(matches!(
            ErrorClassifier::new(generic, SERVICE),
            Err(RuleError::GenericRule)
        ));

        let empty = RuleSet {
            rules: vec![ClassificationRule {
                category: ErrorCategory::Unauthorized,
                patterns: vec![String::new()],
                message: "x".to_owned(),
            }],
            fallback_message: default_fallback_message(),
        };
        assert!(matches!(
            ErrorClassifier::new(empty, SERVICE),
            Err(RuleError::EmptyPattern(ErrorCategory::Unauthorized))
        ));

        let mut duplicated = RuleSet::default();
        let copy = duplicated.rules.get(1).cloned().unwrap();
        duplicated.rules.push(copy);
        assert!(matches!(
            ErrorClassifier::new(duplicated, SERVICE),
            Err(RuleError::DuplicateCategory(ErrorCategory::Unauthorized))
        ));
    }

    #[test]
    fn test_defaults_match_validated_table() {
        let validated = ErrorClassifier::new(RuleSet::default(), SERVICE).unwrap();
        assert_eq!(validated.rules(), classifier().rules());
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let json = serde_json::to_value(ErrorOutcome::locked()).unwrap();
        assert_eq!(json["category"], "unauthorized");
        assert_eq!(json["shouldLockSession"], true);
        assert!(json["userMessage"].is_string());
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_internal_outcomes_are_not_matched_by_text() {
        let classifier = classifier();

        let echoed = classifier.classify(&ErrorOutcome::not_ready().user_message);
        assert_eq!(echoed.kind(), OutcomeKind::Classified);
        assert!(!echoed.is_not_ready());
        assert_ne!(echoed, ErrorOutcome::not_ready());

        let echoed = classifier.classify(&ErrorOutcome::incorrect_credential().user_message);
        assert!(!echoed.is_rejected_unlock());

        assert!(ErrorOutcome::not_ready().is_not_ready());
        assert!(ErrorOutcome::incorrect_credential().is_rejected_unlock());
        assert!(ErrorOutcome::access_denied().is_rejected_unlock());
        assert!(!ErrorOutcome::locked().is_rejected_unlock());
    }
}
