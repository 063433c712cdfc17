//! Admin access services.
//!
//! # Services
//!
//! - `classifier` - Maps raw backend failures to user messages and lock decisions
//! - `session` - Admin unlock/lock lifecycle for one browsing session
//! - `privileged` - Wrapper every admin-only backend call goes through

pub mod classifier;
pub mod privileged;
pub mod session;

pub use classifier::{
    ClassificationRule, ErrorCategory, ErrorClassifier, ErrorOutcome, OutcomeKind, RuleError,
    RuleSet,
};
pub use privileged::{AdminOperations, LISTING_TTL, ListingCache};
pub use session::{AccessModel, AdminSession, AdminStatus, Verification};
