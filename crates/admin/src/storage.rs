//! Browsing-session scoped storage for the admin unlock marker.
//!
//! One marker is stored per browsing session, under one of two well-known
//! keys depending on the access model:
//! - `admin_session_password` holds the entered password (password model)
//! - `admin_unlocked` holds a `true` flag (identity model)
//!
//! Only [`AdminSession`](crate::services::AdminSession) writes markers, and
//! only its `restore` reads them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use uuid::Uuid;

/// Key for the stored password (password model).
pub const CREDENTIAL_KEY: &str = "admin_session_password";

/// Key for the "previously unlocked" flag (identity model).
pub const UNLOCKED_KEY: &str = "admin_unlocked";

/// What a browsing session remembers about a previous unlock.
#[derive(Clone)]
pub enum AccessMarker {
    /// The password that unlocked the panel.
    Credential(SecretString),
    /// The panel was unlocked by a verified admin identity; re-verify on restore.
    Unlocked,
}

impl AccessMarker {
    /// Storage key this marker lives under.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Credential(_) => CREDENTIAL_KEY,
            Self::Unlocked => UNLOCKED_KEY,
        }
    }

    fn encode(&self) -> (&'static str, String) {
        match self {
            Self::Credential(secret) => (CREDENTIAL_KEY, secret.expose_secret().to_owned()),
            Self::Unlocked => (UNLOCKED_KEY, "true".to_owned()),
        }
    }

    fn decode(key: &str, value: &str) -> Option<Self> {
        match key {
            CREDENTIAL_KEY => Some(Self::Credential(SecretString::from(value.to_owned()))),
            UNLOCKED_KEY if value == "true" => Some(Self::Unlocked),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AccessMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credential(_) => f.write_str("Credential([REDACTED])"),
            Self::Unlocked => f.write_str("Unlocked"),
        }
    }
}

/// Marker storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store could not be reached.
    #[error("marker storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-value storage scoped to one browsing session.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Read the stored marker, if any.
    async fn load(&self) -> Result<Option<AccessMarker>, StorageError>;

    /// Replace any stored marker with `marker`.
    async fn save(&self, marker: &AccessMarker) -> Result<(), StorageError>;

    /// Remove any stored marker. Removing nothing is not an error.
    async fn clear(&self) -> Result<(), StorageError>;
}

fn first_marker<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> Option<AccessMarker> {
    let entries: Vec<_> = entries.collect();
    [CREDENTIAL_KEY, UNLOCKED_KEY].into_iter().find_map(|wanted| {
        entries
            .iter()
            .find(|(key, _)| *key == wanted)
            .and_then(|(key, value)| AccessMarker::decode(key, value))
    })
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory marker store.
///
/// Clones share the same contents, so a clone handed to a second
/// `AdminSession` behaves like the same browser tab reopening the app.
#[derive(Clone, Default)]
pub struct MemoryMarkerStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    entries: Mutex<HashMap<&'static str, String>>,
    writes: AtomicUsize,
}

impl MemoryMarkerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored entries, for inspection.
    #[must_use]
    pub fn entries(&self) -> HashMap<String, String> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    /// Number of `save`/`clear` calls seen so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MemoryMarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMarkerStore")
            .field("writes", &self.writes())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MarkerStore for MemoryMarkerStore {
    async fn load(&self) -> Result<Option<AccessMarker>, StorageError> {
        let entries = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(first_marker(
            entries.iter().map(|(key, value)| (*key, value.as_str())),
        ))
    }

    async fn save(&self, marker: &AccessMarker) -> Result<(), StorageError> {
        let (key, value) = marker.encode();
        let mut entries = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        entries.insert(key, value);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Server-side scoped store
// =============================================================================

/// Markers for every browsing session the server knows about.
///
/// Entries idle out after the browser session's inactivity expiry, which is
/// what makes them session-scoped: once the cookie is gone, so is the marker.
#[derive(Clone)]
pub struct ScopedMarkers {
    cache: Cache<Uuid, (&'static str, String)>,
}

impl ScopedMarkers {
    /// Create marker storage with the given session inactivity expiry.
    #[must_use]
    pub fn new(session_idle: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(session_idle)
                .build(),
        }
    }

    /// Store view for one browsing session.
    #[must_use]
    pub fn for_gate(&self, gate: Uuid) -> ScopedMarkerStore {
        ScopedMarkerStore {
            markers: self.clone(),
            gate,
        }
    }
}

/// [`MarkerStore`] for one browsing session, identified by its gate id.
#[derive(Clone)]
pub struct ScopedMarkerStore {
    markers: ScopedMarkers,
    gate: Uuid,
}

#[async_trait]
impl MarkerStore for ScopedMarkerStore {
    async fn load(&self) -> Result<Option<AccessMarker>, StorageError> {
        Ok(self
            .markers
            .cache
            .get(&self.gate)
            .await
            .and_then(|(key, value)| AccessMarker::decode(key, &value)))
    }

    async fn save(&self, marker: &AccessMarker) -> Result<(), StorageError> {
        self.markers.cache.insert(self.gate, marker.encode()).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.markers.cache.invalidate(&self.gate).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_keeps_one_marker() {
        let store = MemoryMarkerStore::new();
        store
            .save(&AccessMarker::Credential(SecretString::from("pw")))
            .await
            .unwrap();
        store.save(&AccessMarker::Unlocked).await.unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get(UNLOCKED_KEY).map(String::as_str), Some("true"));
        assert!(matches!(
            store.load().await.unwrap(),
            Some(AccessMarker::Unlocked)
        ));
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_contents() {
        let store = MemoryMarkerStore::new();
        let reopened = store.clone();
        store.save(&AccessMarker::Unlocked).await.unwrap();
        assert!(reopened.load().await.unwrap().is_some());

        reopened.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_scoped_store_isolates_gates() {
        let markers = ScopedMarkers::new(Duration::from_secs(60));
        let first = markers.for_gate(Uuid::new_v4());
        let second = markers.for_gate(Uuid::new_v4());

        first
            .save(&AccessMarker::Credential(SecretString::from("pw")))
            .await
            .unwrap();

        match first.load().await.unwrap() {
            Some(AccessMarker::Credential(secret)) => assert_eq!(secret.expose_secret(), "pw"),
            other => panic!("unexpected marker: {other:?}"),
        }
        assert!(second.load().await.unwrap().is_none());

        first.clear().await.unwrap();
        assert!(first.load().await.unwrap().is_none());
    }

    #[test]
    fn test_marker_debug_redacts_credential() {
        let marker = AccessMarker::Credential(SecretString::from("hunter2"));
        let debug = format!("{marker:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(marker.key(), CREDENTIAL_KEY);
    }
}
