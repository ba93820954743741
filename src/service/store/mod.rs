pub mod local;

use std::{
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use crate::base::types::{Res, Void};

// Traits.

/// Generic attachment store trait that implementations must satisfy.
///
/// This trait defines the core functionality for persisting downloaded
/// attachments and encoding them for transport. Implementing this trait
/// allows different storage backends to be used with the bot.
#[async_trait]
pub trait GenericAttachmentStore: Send + Sync + 'static {
    /// Persist one attachment's bytes, returning the path written.
    async fn save(&self, attachment_id: &str, bytes: &[u8]) -> Res<PathBuf>;

    /// Read a stored attachment back and return it as standard base64.
    async fn encode(&self, path: &Path) -> Res<String>;

    /// Best-effort removal of a stored attachment. A missing file is not an error.
    async fn remove(&self, path: &Path) -> Void;
}

// Structs.

/// Attachment store for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct AttachmentStore {
    inner: Arc<dyn GenericAttachmentStore>,
}

impl Deref for AttachmentStore {
    type Target = dyn GenericAttachmentStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl AttachmentStore {
    pub fn new(inner: Arc<dyn GenericAttachmentStore>) -> Self {
        Self { inner }
    }
}
