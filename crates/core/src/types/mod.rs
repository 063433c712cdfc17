//! Core types for the Job Center.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod principal;
pub mod records;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use principal::Principal;
pub use records::*;
pub use role::UserRole;
