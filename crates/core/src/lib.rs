//! Job Center Core - Shared types library.
//!
//! This crate provides common types used across all Job Center components:
//! - `admin` - Admin access gate and privileged operations against the backend
//! - `cli` - Command-line tools for operators
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no session
//! state. It mirrors the record shapes exchanged with the remote job-board
//! backend so every component speaks the same vocabulary.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, identities, roles, and backend records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
