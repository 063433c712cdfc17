//! HTTP middleware for admin.
//!
//! - `session` - tower-sessions layer and the per-browser gate id
//! - `gate` - extractors that resolve and enforce the admin session

pub mod gate;
pub mod session;

pub use gate::{AdminGate, RequireUnlocked, SessionRegistry, caller_from_headers};
pub use session::{SESSION_COOKIE_NAME, SESSION_IDLE, create_session_layer, gate_id};
