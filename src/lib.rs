//! Library root for `guild-responder`.
//!
//! Guild-responder is a configuration-driven auto-responder engine for guild
//! communities:
//! - Matches incoming messages against operator-configured triggers
//! - Evaluates filters, cooldowns, and input limits per trigger
//! - Invokes pluggable responders for dynamic replies
//! - Delivers responses to channels, replies, or DMs
//!
//! The chat gateway, module-enablement storage, and responder documents are
//! reached through service traits, allowing different hosts to embed the
//! engine.

pub mod base;
pub mod responder;
pub mod runtime;
pub mod service;

pub mod prelude;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up the runtime and starts the responder:
/// - Creates the runtime context with store, module gate, and console host
/// - Starts the host's event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting guild-responder ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
