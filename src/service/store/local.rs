//! Local-filesystem attachment storage.
//!
//! Attachments are written as individual files under a fixed upload
//! directory, named by attachment identifier with a `.jpg` extension. This
//! is the only on-disk state the bot keeps.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use tracing::{debug, instrument};

use crate::base::types::{BotError, Res, Void};

use super::{AttachmentStore, GenericAttachmentStore};

// Extra methods on `AttachmentStore` applied by the local implementation.

impl AttachmentStore {
    /// Creates a local store rooted at `upload_dir`.
    ///
    /// The directory is created here, idempotently, so it is guaranteed to
    /// exist before the first save.
    pub async fn local(upload_dir: impl Into<PathBuf>) -> Res<Self> {
        let store = LocalAttachmentStore::new(upload_dir).await?;
        Ok(Self { inner: Arc::new(store) })
    }
}

// Specific implementations.

/// Attachment store backed by a directory on the local filesystem.
struct LocalAttachmentStore {
    upload_dir: PathBuf,
}

impl LocalAttachmentStore {
    #[instrument(name = "LocalAttachmentStore::new", skip_all)]
    async fn new(upload_dir: impl Into<PathBuf>) -> Res<Self> {
        let upload_dir = upload_dir.into();

        tokio::fs::create_dir_all(&upload_dir).await.map_err(BotError::Io)?;

        Ok(Self { upload_dir })
    }
}

#[async_trait]
impl GenericAttachmentStore for LocalAttachmentStore {
    #[instrument(skip(self, bytes))]
    async fn save(&self, attachment_id: &str, bytes: &[u8]) -> Res<PathBuf> {
        let path = self.upload_dir.join(format!("{attachment_id}.jpg"));

        tokio::fs::write(&path, bytes).await.map_err(BotError::Io)?;

        debug!("Attachment saved: {}", path.display());

        Ok(path)
    }

    #[instrument(skip(self))]
    async fn encode(&self, path: &Path) -> Res<String> {
        let bytes = tokio::fs::read(path).await.map_err(BotError::Io)?;

        Ok(BASE64_STANDARD.encode(bytes))
    }

    #[instrument(skip(self))]
    async fn remove(&self, path: &Path) -> Void {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BotError::Io(e).into()),
        }
    }
}

// Tests.
