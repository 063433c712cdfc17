//! Job Center admin library.
//!
//! The admin panel of the job board is gated by an [`AdminSession`]: it is
//! locked until the caller proves admin rights, either with a shared password
//! or by the backend confirming the caller's admin role. Backend failures are
//! interpreted by an [`ErrorClassifier`], and every privileged backend call
//! goes through [`AdminOperations`], which locks the session again when a
//! failure means the admin rights are gone.
//!
//! The crate also ships the axum server that exposes this gate over HTTP.
//!
//! [`AdminSession`]: services::AdminSession
//! [`ErrorClassifier`]: services::ErrorClassifier
//! [`AdminOperations`]: services::AdminOperations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
