//! Newtype IDs for backend records.
//!
//! The backend hands out unbounded natural numbers for every record it stores.
//! `define_id!` wraps them so a post ID can never be passed where a job ID is
//! expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `u64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `get()`
/// - `From<u64>`, `Into<u64>`, `Display` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use jobcenter_core::define_id;
/// define_id!(VacancyId);
/// define_id!(NoticeId);
///
/// let vacancy = VacancyId::new(7);
/// let notice = NoticeId::new(7);
///
/// // These are different types, so this won't compile:
/// // let _: VacancyId = notice;
/// assert_eq!(vacancy.get(), notice.get());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new ID from a raw backend value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying backend value.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(JobId);
define_id!(PostId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_bare_number() {
        let id = JobId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: JobId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_from_path_segment() {
        let id: PostId = "17".parse().unwrap();
        assert_eq!(id.get(), 17);
        assert!("seventeen".parse::<PostId>().is_err());
        assert!("-1".parse::<PostId>().is_err());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(JobId::new(9).to_string(), "9");
    }
}
