use std::path::PathBuf;

use serde_json::Value;
use tracing::{error, info, instrument};

use crate::{
    base::{
        prompts,
        types::{Command, InboundEvent, Res},
    },
    service::{chat::ChatClient, llm::LlmClient, session::SessionStore, store::AttachmentStore},
};

/// Handles one inbound platform event end to end.
///
/// The router itself is stateless; all state lives in the session registry.
/// Expected failures (attachment download, storage, encoding, the provider
/// call) become fixed-text replies so the user always hears back. Only a
/// failed reply delivery escapes as an error, which fails the webhook batch.
/// Unrecognized event types resolve to `Ok(None)` — no reply, no error.
#[instrument(skip_all)]
pub async fn handle_event(event: InboundEvent, session: SessionStore, store: AttachmentStore, llm: LlmClient, chat: ChatClient) -> Res<Option<Value>> {
    match event {
        InboundEvent::Image {
            user_id,
            reply_token,
            message_id,
        } => handle_image(&user_id, &reply_token, &message_id, &session, &store, &chat).await.map(Some),
        InboundEvent::Text { user_id, reply_token, text } => handle_text(&user_id, &reply_token, &text, &session, &llm, &chat).await.map(Some),
        InboundEvent::Other => Ok(None),
    }
}

#[instrument(skip(session, store, chat))]
async fn handle_image(user_id: &str, reply_token: &str, message_id: &str, session: &SessionStore, store: &AttachmentStore, chat: &ChatClient) -> Res<Value> {
    let _ = session.get_or_create(user_id).await;

    info!("Received image from user: {user_id}");

    match receive_image(message_id, store, chat).await {
        Ok((path, encoded)) => {
            session.set_image(user_id, path, encoded).await?;
            chat.reply_message(reply_token, prompts::IMAGE_RECEIVED_MESSAGE).await
        }
        Err(e) => {
            error!("Image processing error: {e}");
            chat.reply_message(reply_token, prompts::IMAGE_ERROR_MESSAGE).await
        }
    }
}

/// Download, persist, and encode one attachment.
///
/// The session stays untouched until every step has succeeded, so a failure
/// leaves whatever image was previously on file usable.
async fn receive_image(message_id: &str, store: &AttachmentStore, chat: &ChatClient) -> Res<(PathBuf, String)> {
    let bytes = chat.get_message_content(message_id).await?;
    let path = store.save(message_id, &bytes).await?;
    let encoded = store.encode(&path).await?;

    Ok((path, encoded))
}

#[instrument(skip(session, llm, chat))]
async fn handle_text(user_id: &str, reply_token: &str, text: &str, session: &SessionStore, llm: &LlmClient, chat: &ChatClient) -> Res<Value> {
    let current = session.get_or_create(user_id).await;
    let text = text.trim();

    // Commands are classified before the has-image check so they work with
    // no image on file.
    match Command::parse(text) {
        Some(Command::Greet) => return chat.reply_message(reply_token, prompts::WELCOME_MESSAGE).await,
        Some(Command::Clear) => {
            session.clear(user_id).await?;
            return chat.reply_message(reply_token, prompts::CLEARED_MESSAGE).await;
        }
        None => {}
    }

    // Anything that is not a command is a question about the stored image.
    let Some(encoded) = current.last_image_encoded else {
        return chat.reply_message(reply_token, prompts::NO_IMAGE_MESSAGE).await;
    };

    info!("Processing question for user: {user_id}");

    match llm.ask(text, Some(&encoded)).await {
        Ok(answer) => {
            let reply = format!("{}{}{}", prompts::ANSWER_PREFIX, answer, prompts::ANSWER_DISCLAIMER);
            chat.reply_message(reply_token, &reply).await
        }
        Err(e) => {
            error!("AI processing error: {e}");
            chat.reply_message(reply_token, prompts::ANALYSIS_ERROR_MESSAGE).await
        }
    }
}
