//! Session middleware configuration for admin.
//!
//! Browsing sessions use an in-memory tower-sessions store with strict cookie
//! settings (SameSite=Strict, 24hr inactivity expiry). The only value kept in
//! the session is a random gate id; admin markers and session state are keyed
//! by it, so they end when the browsing session does.

use std::time::Duration;

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "jc_admin_session";

/// Session key holding the gate id.
pub const GATE_KEY: &str = "admin_gate";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Browsing-session inactivity expiry, for state keyed by gate id.
#[allow(clippy::cast_sign_loss)]
pub const SESSION_IDLE: Duration = Duration::from_secs(SESSION_EXPIRY_SECONDS as u64);

/// Create the session layer with an in-memory store.
///
/// `secure` marks the cookie HTTPS-only; pass `true` when the public base
/// URL is `https://`.
#[must_use]
pub fn create_session_layer(secure: bool) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

/// The gate id for this browsing session, created on first use.
///
/// # Errors
///
/// Returns the session store error if the session cannot be read or written.
pub async fn gate_id(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(id) = session.get::<Uuid>(GATE_KEY).await? {
        return Ok(id);
    }
    let id = Uuid::new_v4();
    session.insert(GATE_KEY, id).await?;
    tracing::debug!(gate = %id, "New admin gate");
    Ok(id)
}
