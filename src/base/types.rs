use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Failure classes for the bot.
///
/// `Transport` covers platform and AI provider network/HTTP failures, `Io`
/// covers local filesystem failures during attachment handling, and
/// `Protocol` covers malformed webhook or provider payloads.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol failure: {0}")]
    Protocol(String),
}

/// Per-user conversational state retained across messages.
///
/// `last_image_encoded` is present if and only if `last_image_path` pointed
/// at a readable file at encoding time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub last_image_path: Option<PathBuf>,
    pub last_image_encoded: Option<String>,
}

impl Session {
    pub fn has_image(&self) -> bool {
        self.last_image_encoded.is_some()
    }
}

/// One inbound platform event, reduced to what the router needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Image {
        user_id: String,
        reply_token: String,
        message_id: String,
    },
    Text {
        user_id: String,
        reply_token: String,
        text: String,
    },
    Other,
}

/// Keywords that trigger the onboarding message.
pub const GREET_KEYWORDS: &[&str] = &["เริ่มต้น", "start", "สวัสดี", "hello"];

/// Keywords that clear the user's stored image.
pub const CLEAR_KEYWORDS: &[&str] = &["ลบข้อมูล", "clear", "เคลียร์"];

/// Recognized keyword commands.
///
/// Adding a locale variant means adding a keyword to the matching set above,
/// not a new branch in the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Greet,
    Clear,
}

impl Command {
    /// Classifies a trimmed message as a command, if it matches a keyword
    /// set exactly (case-insensitive, never by substring).
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();

        if GREET_KEYWORDS.contains(&normalized.as_str()) {
            return Some(Self::Greet);
        }

        if CLEAR_KEYWORDS.contains(&normalized.as_str()) {
            return Some(Self::Clear);
        }

        None
    }
}
