//! In-memory session registry.
//!
//! Sessions live for the process lifetime; there is no expiry or eviction
//! and nothing is persisted across restarts. The map lock serializes
//! individual reads and writes only — two events for the same user may still
//! interleave between calls (the double-send race), which is an accepted
//! limitation of this deployment shape.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::base::types::{Session, Void};

use super::{GenericSessionStore, SessionStore};

// Extra methods on `SessionStore` applied by the in-memory implementation.

impl SessionStore {
    /// Creates an empty in-memory registry.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(MemorySessionStore::default()),
        }
    }
}

// Specific implementations.

/// Process-wide session map keyed by user identifier.
#[derive(Default)]
struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

#[async_trait]
impl GenericSessionStore for MemorySessionStore {
    async fn get_or_create(&self, user_id: &str) -> Session {
        self.sessions.write().await.entry(user_id.to_string()).or_default().clone()
    }

    #[instrument(skip(self, encoded))]
    async fn set_image(&self, user_id: &str, path: PathBuf, encoded: String) -> Void {
        let superseded = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.entry(user_id.to_string()).or_default();

            let superseded = session.last_image_path.replace(path.clone());
            session.last_image_encoded = Some(encoded);

            superseded
        };

        // The overwritten file would otherwise never be reclaimed.
        if let Some(old) = superseded
            && old != path
        {
            remove_file_best_effort(&old).await;
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self, user_id: &str) -> Void {
        let removed = self.sessions.write().await.remove(user_id);

        if let Some(path) = removed.and_then(|s| s.last_image_path) {
            remove_file_best_effort(&path).await;
        }

        Ok(())
    }

    async fn has_image(&self, user_id: &str) -> bool {
        self.sessions.read().await.get(user_id).map(Session::has_image).unwrap_or(false)
    }
}

/// Deletes a stored attachment, logging anything other than "already gone".
async fn remove_file_best_effort(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to delete attachment {}: {}", path.display(), e);
    }
}

// Tests.
