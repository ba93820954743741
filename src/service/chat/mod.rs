pub mod line;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::base::types::{Res, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat
/// platforms like LINE. Implementing this trait allows different chat
/// services to be used with the bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start the chat client listener.
    ///
    /// This binds the webhook and health endpoints and begins processing
    /// incoming events.
    async fn start(&self) -> Void;

    /// Reply to an inbound event.
    ///
    /// Reply tokens are single-use and expire; the platform enforces both,
    /// so at most one reply is ever sent per inbound event. Returns the
    /// platform's response body.
    async fn reply_message(&self, reply_token: &str, text: &str) -> Res<Value>;

    /// Download an attachment's bytes through the platform's content API.
    async fn get_message_content(&self, message_id: &str) -> Res<Vec<u8>>;
}

// Structs.

/// Chat client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
