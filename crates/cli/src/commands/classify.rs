//! Error classification commands.
//!
//! # Usage
//!
//! ```bash
//! jc-cli classify "trap: Unauthorized: Only admins can do this"
//! jc-cli rules --service gkorp-uqaaa-aaaab-qeptq-cai
//! ```

use std::path::Path;

use jobcenter_admin::services::{ErrorClassifier, RuleError};
use thiserror::Error;

/// Errors from the classification commands.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Rule file missing or invalid.
    #[error(transparent)]
    Rules(#[from] RuleError),

    /// Output could not be rendered.
    #[error("Could not render output: {0}")]
    Json(#[from] serde_json::Error),

    /// Output could not be rendered.
    #[error("Could not render output: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn load(rules: Option<&Path>, service: &str) -> Result<ErrorClassifier, RuleError> {
    match rules {
        Some(path) => ErrorClassifier::from_yaml_file(path, service),
        None => Ok(ErrorClassifier::with_defaults(service)),
    }
}

/// The outcome for `message`, as pretty JSON.
fn render_outcome(classifier: &ErrorClassifier, message: &str) -> Result<String, ClassifyError> {
    Ok(serde_json::to_string_pretty(&classifier.classify(message))?)
}

/// Print how `message` would be classified.
///
/// # Errors
///
/// Returns an error if the rule file is invalid.
pub fn classify(message: &str, rules: Option<&Path>, service: &str) -> Result<(), ClassifyError> {
    let classifier = load(rules, service)?;
    let rendered = render_outcome(&classifier, message)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

/// Print the effective rule table as YAML.
///
/// # Errors
///
/// Returns an error if the rule file is invalid.
pub fn rules(rules: Option<&Path>, service: &str) -> Result<(), ClassifyError> {
    let classifier = load(rules, service)?;
    let rendered = serde_yaml::to_string(&classifier.to_rule_set())?;

    #[allow(clippy::print_stdout)]
    {
        print!("{rendered}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_outcome() {
        let classifier = load(None, "gkorp-uqaaa-aaaab-qeptq-cai").unwrap();
        let rendered = render_outcome(&classifier, "Reject code: 5, canister is stopped").unwrap();

        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["category"], "stopped_service");
        assert_eq!(value["shouldLockSession"], true);
        assert!(
            value["userMessage"]
                .as_str()
                .unwrap()
                .contains("gkorp-uqaaa-aaaab-qeptq-cai")
        );
    }

    #[test]
    fn test_missing_rule_file() {
        let result = load(Some(Path::new("/nonexistent/rules.yaml")), "backend");
        assert!(matches!(result, Err(RuleError::Io(_))));
    }
}
