pub mod memory;

use std::{ops::Deref, path::PathBuf, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Session, Void};

// Traits.

/// Generic session registry trait that implementations must satisfy.
///
/// This trait defines the core functionality for keeping per-user
/// conversational state. The router only depends on this interface, so the
/// backing store can be swapped (in-memory for a single process, an external
/// keyed store for multi-instance deployments).
#[async_trait]
pub trait GenericSessionStore: Send + Sync + 'static {
    /// Returns the user's session, creating an empty one on first sight.
    ///
    /// Repeated calls for the same user within the process lifetime observe
    /// the same record.
    async fn get_or_create(&self, user_id: &str) -> Session;

    /// Records a freshly stored attachment on the user's session,
    /// overwriting both the path and the encoded payload.
    async fn set_image(&self, user_id: &str, path: PathBuf, encoded: String) -> Void;

    /// Drops the user's session entirely.
    ///
    /// The backing attachment file, if any, is deleted best-effort; clearing
    /// a user that was never seen is a no-op success.
    async fn clear(&self, user_id: &str) -> Void;

    /// Whether the user currently has an encoded image on file.
    async fn has_image(&self, user_id: &str) -> bool;
}

// Structs.

/// Session registry for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<dyn GenericSessionStore>,
}

impl Deref for SessionStore {
    type Target = dyn GenericSessionStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl SessionStore {
    pub fn new(inner: Arc<dyn GenericSessionStore>) -> Self {
        Self { inner }
    }
}
