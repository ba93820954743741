//! Runtime services and shared state for the health-scan-bot.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, llm::LlmClient, session::SessionStore, store::AttachmentStore},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the session registry, attachment store, LLM client, and
/// chat client. It is designed to be trivially cloneable, allowing it to be
/// passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The session registry instance.
    pub session: SessionStore,
    /// The attachment store instance.
    pub store: AttachmentStore,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The LINE client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Sessions live in memory for the process lifetime.
        let session = SessionStore::memory();

        // The upload directory is created here, before the first webhook arrives.
        let store = AttachmentStore::local(config.upload_dir.as_str()).await?;

        // Initialize the LLM client.
        let llm = LlmClient::anthropic(&config);

        // Initialize the LINE client, which hosts the webhook server.
        let chat = ChatClient::line(&config, session.clone(), store.clone(), llm.clone());

        Ok(Self {
            config,
            session,
            store,
            llm,
            chat,
        })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
