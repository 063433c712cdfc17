//! CLI command implementations.

pub mod access;
pub mod classify;
