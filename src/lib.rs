//! Library root for `health-scan-bot`.
//!
//! Health-scan-bot is a Claude-powered LINE assistant designed to:
//! - Accept health-report photos from users
//! - Answer follow-up questions about the stored photo in plain Thai
//! - Keep one short-lived image per user across a conversation
//! - Always produce a reply, substituting a fixed apology on failure
//!
//! The bot integrates with LINE for chat and Anthropic for multimodal
//! inference. The architecture is built around extensible traits that allow
//! for different implementations of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the health-scan-bot runtime:
/// - Creates the runtime context with session, store, LLM, and chat clients
/// - Starts the webhook server that processes platform events
pub async fn start(config: Config) -> Void {
    info!("Starting health-scan-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
