//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default Anthropic model to use
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

/// Default max output tokens for the Anthropic model
fn default_anthropic_max_tokens() -> u32 {
    1000
}

/// Default listen port for the webhook server
fn default_port() -> u16 {
    3000
}

/// Default directory for stored attachments
fn default_upload_dir() -> String {
    "uploads".to_string()
}

/// Default prompt template for text-only questions.
fn default_text_prompt_template() -> String {
    prompts::TEXT_PROMPT_TEMPLATE.to_string()
}

/// Default prompt template for image-bearing questions.
fn default_image_prompt_template() -> String {
    prompts::IMAGE_PROMPT_TEMPLATE.to_string()
}

/// Configuration for the health-scan-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// LINE channel access token (`LINE_CHANNEL_ACCESS_TOKEN`).
    pub line_channel_access_token: String,
    /// LINE channel secret used for webhook signature checks (`LINE_CHANNEL_SECRET`).
    pub line_channel_secret: String,
    /// Anthropic API key (`ANTHROPIC_API_KEY`).
    pub anthropic_api_key: String,
    /// Anthropic model to use (`ANTHROPIC_MODEL`).
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    /// Max output tokens for the Anthropic model (`ANTHROPIC_MAX_TOKENS`).
    #[serde(default = "default_anthropic_max_tokens")]
    pub anthropic_max_tokens: u32,
    /// Listen port for the webhook server (`PORT`).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory where downloaded attachments are stored (`UPLOAD_DIR`).
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Optional custom text-only prompt template to override the default (`TEXT_PROMPT_TEMPLATE`).
    /// Must carry a `{question}` placeholder.
    #[serde(default = "default_text_prompt_template")]
    pub text_prompt_template: String,
    /// Optional custom image-analysis prompt template to override the default (`IMAGE_PROMPT_TEMPLATE`).
    /// Must carry a `{question}` placeholder.
    #[serde(default = "default_image_prompt_template")]
    pub image_prompt_template: String,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("HEALTH_SCAN_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        if result.anthropic_max_tokens < 1 || result.anthropic_max_tokens > 64000 {
            return Err(anyhow::anyhow!("Anthropic max tokens must be between 1 and 64000."));
        }

        if !result.text_prompt_template.contains("{question}") || !result.image_prompt_template.contains("{question}") {
            return Err(anyhow::anyhow!("Prompt templates must contain a {{question}} placeholder."));
        }

        Ok(result)
    }
}
