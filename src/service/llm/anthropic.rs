//! Integration with the Anthropic Messages API.
//!
//! This module provides a thin wrapper around the inference endpoint for
//! answering user questions, with and without an attached health-report
//! photo. The request is composed from the configured prompt templates; the
//! response-length directives inside those templates are advisory to the
//! model and are not enforced locally.
//!
//! No retry or timeout is imposed here beyond what the HTTP client applies
//! to its own calls; a hung provider call stalls only that event's reply.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::base::{
    config::Config,
    types::{BotError, Res},
};

use super::{GenericLlmClient, LlmClient};

const MESSAGES_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Attachments are always stored as JPEG (see the attachment store).
const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

// Extra methods on `LlmClient` applied by the Anthropic implementation.

impl LlmClient {
    pub fn anthropic(config: &Config) -> Self {
        let client = AnthropicLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// Anthropic LLM client implementation.
#[derive(Clone)]
pub struct AnthropicLlmClient {
    client: reqwest::Client,
    config: Config,
}

impl AnthropicLlmClient {
    /// Create a new Anthropic LLM client.
    #[instrument(name = "AnthropicLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Build the request body for a question, with or without an image.
    fn build_request(&self, question: &str, encoded_image: Option<&str>) -> CreateMessageRequest {
        let content = match encoded_image {
            Some(data) => vec![
                ContentBlock::Image {
                    source: ImageSource {
                        source_type: "base64".to_string(),
                        media_type: IMAGE_MEDIA_TYPE.to_string(),
                        data: data.to_string(),
                    },
                },
                ContentBlock::Text {
                    text: self.config.image_prompt_template.replace("{question}", question),
                },
            ],
            None => vec![ContentBlock::Text {
                text: self.config.text_prompt_template.replace("{question}", question),
            }],
        };

        CreateMessageRequest {
            model: self.config.anthropic_model.clone(),
            max_tokens: self.config.anthropic_max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content,
            }],
        }
    }
}

#[async_trait]
impl GenericLlmClient for AnthropicLlmClient {
    #[instrument(name = "AnthropicLlmClient::ask", skip_all)]
    async fn ask(&self, question: &str, encoded_image: Option<&str>) -> Res<String> {
        let request = self.build_request(question, encoded_image);

        info!("Calling Anthropic with {} request", if encoded_image.is_some() { "an image+text" } else { "a text-only" });

        let response = self
            .client
            .post(MESSAGES_ENDPOINT)
            .header("x-api-key", &self.config.anthropic_api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Transport(format!("Anthropic returned {status}: {body}")).into());
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|e| BotError::Protocol(format!("Malformed Anthropic response: {e}")))?;

        extract_answer(parsed)
    }
}

/// Pull the first text block out of a provider response.
fn extract_answer(response: CreateMessageResponse) -> Res<String> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ResponseContent::Text { text } => Some(text),
            ResponseContent::Other => None,
        })
        .ok_or_else(|| BotError::Protocol("Anthropic response contained no text block".to_string()).into())
}

// Wire types for the Messages API.

#[derive(Debug, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ResponseContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ResponseContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

// Tests.
