pub mod anthropic;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::Res;

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with multimodal
/// language models. Implementing this trait allows different AI providers to
/// be used with the bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Ask a question, optionally against a previously encoded image.
    ///
    /// `encoded_image` is the standard-base64 payload of a stored JPEG. When
    /// present, the image+text request variant is built; otherwise the
    /// request is text-only. Failures surface as errors here — substituting
    /// a user-facing fallback is the caller's decision, not this client's.
    async fn ask(&self, question: &str, encoded_image: Option<&str>) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
