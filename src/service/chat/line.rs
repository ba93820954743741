//! Chat service integration for the LINE Messaging API.
//!
//! This module hosts the HTTP surface of the bot:
//! - `POST /webhook` accepts signed event batches from the platform
//! - `GET /` is a fixed health payload
//!
//! and the outbound platform calls (reply API, content download). Webhook
//! bodies are authenticated with the channel secret (HMAC-SHA256 over the
//! raw body, base64, sent in `X-Line-Signature`).

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{BotError, InboundEvent, Res, Void},
    },
    interaction,
    service::{llm::LlmClient, session::SessionStore, store::AttachmentStore},
};

use super::{ChatClient, GenericChatClient};

const REPLY_ENDPOINT: &str = "https://api.line.me/v2/bot/message/reply";
const CONTENT_ENDPOINT_BASE: &str = "https://api-data.line.me/v2/bot/message";

const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

// Extra methods on `ChatClient` applied by the LINE implementation.

impl ChatClient {
    /// Creates a new LINE chat client.
    pub fn line(config: &Config, session: SessionStore, store: AttachmentStore, llm: LlmClient) -> Self {
        let client = LineChatClient::new(config, session, store, llm);
        Self { inner: Arc::new(client) }
    }
}

impl From<LineChatClient> for ChatClient {
    fn from(client: LineChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Shared state for the webhook server.
#[derive(Clone)]
struct AppState {
    config: Config,
    session: SessionStore,
    store: AttachmentStore,
    llm: LlmClient,
    chat: ChatClient,
}

/// LINE client implementation.
#[derive(Clone)]
struct LineChatClient {
    config: Config,
    client: reqwest::Client,
    session: SessionStore,
    store: AttachmentStore,
    llm: LlmClient,
}

impl LineChatClient {
    /// Create a new LINE chat client.
    #[instrument(name = "LineChatClient::new", skip_all)]
    fn new(config: &Config, session: SessionStore, store: AttachmentStore, llm: LlmClient) -> Self {
        Self {
            config: config.clone(),
            client: reqwest::Client::new(),
            session,
            store,
            llm,
        }
    }
}

#[async_trait]
impl GenericChatClient for LineChatClient {
    async fn start(&self) -> Void {
        let state = AppState {
            config: self.config.clone(),
            session: self.session.clone(),
            store: self.store.clone(),
            llm: self.llm.clone(),
            chat: ChatClient::from(self.clone()),
        };

        let app = Router::new()
            .route("/webhook", post(webhook_handler))
            .route("/", get(health_handler))
            .with_state(state);

        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Webhook server listening on {addr}");

        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn reply_message(&self, reply_token: &str, text: &str) -> Res<Value> {
        let body = json!({
            "replyToken": reply_token,
            "messages": [{ "type": "text", "text": text }],
        });

        let response = self
            .client
            .post(REPLY_ENDPOINT)
            .bearer_auth(&self.config.line_channel_access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("LINE reply failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Transport(format!("LINE reply returned {status}: {body}")).into());
        }

        let result = response
            .json()
            .await
            .map_err(|e| BotError::Protocol(format!("Malformed LINE reply response: {e}")))?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_message_content(&self, message_id: &str) -> Res<Vec<u8>> {
        let url = format!("{CONTENT_ENDPOINT_BASE}/{message_id}/content");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.line_channel_access_token)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("LINE content download failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Transport(format!("LINE content download returned {status}")).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BotError::Transport(format!("LINE content stream failed: {e}")))?;

        Ok(bytes.to_vec())
    }
}

// Webhook wire format.

/// Signed event batch delivered by the platform.
#[derive(Debug, Deserialize)]
struct WebhookRequest {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    reply_token: Option<String>,
    source: Option<EventSource>,
    message: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Reduce a wire event to the router's inbound variant.
///
/// Anything that is not a user image or text message (stickers, follows,
/// group events, messages with no resolvable user) maps to `Other`, which
/// the router treats as a silent no-op.
fn to_inbound(event: WebhookEvent) -> InboundEvent {
    if event.kind != "message" {
        return InboundEvent::Other;
    }

    let (Some(reply_token), Some(user_id)) = (event.reply_token, event.source.and_then(|s| s.user_id)) else {
        return InboundEvent::Other;
    };

    let Some(message) = event.message else {
        return InboundEvent::Other;
    };

    match message.kind.as_str() {
        "image" => InboundEvent::Image {
            user_id,
            reply_token,
            message_id: message.id,
        },
        "text" => InboundEvent::Text {
            user_id,
            reply_token,
            text: message.text.unwrap_or_default(),
        },
        _ => InboundEvent::Other,
    }
}

// Signature verification.

/// Verify the webhook signature from LINE.
///
/// The signature is HMAC-SHA256 over the raw request body with the channel
/// secret, base64-encoded, delivered in the `X-Line-Signature` header.
fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("failed to create HMAC");
            return false;
        }
    };

    mac.update(body);
    let computed = BASE64_STANDARD.encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks.
    constant_time_eq(&computed, signature)
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Handlers.

/// Accepts one signed batch of platform events.
///
/// All events run concurrently and the response is sent only after every
/// task settles, so one event's failure never blocks another's reply. Any
/// settled failure still turns the whole batch into a 500, which lets the
/// platform redeliver.
#[instrument(skip_all)]
async fn webhook_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();

    if !verify_signature(&state.config.line_channel_secret, &body, signature) {
        warn!("Rejected webhook with a bad signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let request: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed webhook body: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    info!("Received webhook batch of {} events", request.events.len());

    let tasks = request.events.into_iter().map(to_inbound).map(|event| {
        interaction::webhook_event::handle_event(event, state.session.clone(), state.store.clone(), state.llm.clone(), state.chat.clone())
    });

    let results = futures::future::join_all(tasks).await;

    let mut replies = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(value) => replies.push(value.unwrap_or(Value::Null)),
            Err(e) => {
                error!("Webhook event failed: {e}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    Json(replies).into_response()
}

/// Fixed health payload.
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "LINE Health Bot is running!",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// Tests.
