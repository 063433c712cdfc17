//! Caller identity as reported by the backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Textual identity of a backend caller.
///
/// The backend authenticates callers itself and reports them back as an
/// opaque principal string (e.g. `"2vxsx-fae"` for the anonymous caller). We
/// never parse it; it is only compared and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Principal the backend assigns to unauthenticated callers.
    pub const ANONYMOUS: &'static str = "2vxsx-fae";

    /// Wrap a principal string returned by the backend.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The anonymous principal.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_owned())
    }

    /// Whether this is the anonymous principal.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }

    /// Returns the principal as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
