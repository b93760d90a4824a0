//! Wrapper around gateway hosts.
//!
//! The responder core never talks to a chat gateway directly; it goes
//! through [`GenericHost`], which exposes the handful of primitives the
//! engine and delivery need. The production gateway integration lives in
//! the embedding bot process; [`ConsoleHost`] is the in-repo
//! implementation, a line-oriented developer shell.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument};

use crate::{
    base::types::{IncomingMessage, OutboundMessage, Void},
    responder::engine::Engine,
};

// Traits.

/// Generic "host" trait that gateway integrations must implement.
#[async_trait]
pub trait GenericHost {
    /// Get the bot's own user ID.
    fn bot_user_id(&self) -> u64;
    /// Whether the guild currently has the given role.
    async fn guild_has_role(&self, guild_id: u64, role_id: u64) -> bool;
    /// Start the host's event loop.
    async fn start(&self) -> Void;
    /// Send a message to a channel.
    async fn send_channel(&self, channel_id: u64, outbound: &OutboundMessage) -> Void;
    /// Send a message as a reply to another message.
    async fn send_reply(&self, message: &IncomingMessage, outbound: &OutboundMessage) -> Void;
    /// Send a direct message to a user.
    async fn send_dm(&self, user_id: u64, outbound: &OutboundMessage) -> Void;
    /// Show the typing indicator in a channel.
    async fn trigger_typing(&self, channel_id: u64) -> Void;
    /// Delete a message.
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Void;
}

// Structs.

/// Host client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct HostClient {
    inner: Arc<dyn GenericHost + Send + Sync + 'static>,
}

impl std::ops::Deref for HostClient {
    type Target = dyn GenericHost + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl HostClient {
    pub fn new(inner: Arc<dyn GenericHost + Send + Sync + 'static>) -> Self {
        Self { inner }
    }

    /// Creates a console host client for local development.
    pub fn console() -> Self {
        Self { inner: Arc::new(ConsoleHost::new()) }
    }
}

// Specific implementations.

/// Line-oriented console host for local development.
///
/// Every stdin line becomes a message in a synthetic guild; outbound sends
/// are printed to stdout.
pub struct ConsoleHost {
    bot_user_id: u64,
    guild_id: u64,
    channel_id: u64,
    author_id: u64,
    next_message_id: AtomicU64,
    engine: Mutex<Option<Arc<Engine>>>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self {
            bot_user_id: 1,
            guild_id: 100,
            channel_id: 200,
            author_id: 300,
            next_message_id: AtomicU64::new(1),
            engine: Mutex::new(None),
        }
    }

    /// Attach the engine that incoming lines are dispatched to.
    pub fn attach_engine(&self, engine: Arc<Engine>) {
        *self.engine.lock() = Some(engine);
    }

    fn message_from_line(&self, line: &str) -> IncomingMessage {
        let bot_token = format!("<@{}>", self.bot_user_id);
        let mentioned_user_ids = if line.contains(&bot_token) { vec![self.bot_user_id] } else { Vec::new() };

        IncomingMessage {
            id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
            guild_id: Some(self.guild_id),
            channel_id: self.channel_id,
            category_id: None,
            author_id: self.author_id,
            author_is_bot: false,
            author_role_ids: Vec::new(),
            mentioned_user_ids,
            content: line.to_string(),
        }
    }

    fn print_outbound(&self, prefix: &str, outbound: &OutboundMessage) {
        if let Some(content) = outbound.content.as_deref()
            && !content.is_empty()
        {
            println!("{prefix} {content}");
        }
        for embed in &outbound.embeds {
            println!("{prefix} [embed] {}", embed.title.as_deref().unwrap_or(""));
        }
        for file in &outbound.files {
            println!("{prefix} [file] {}", file.path.display());
        }
    }
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenericHost for ConsoleHost {
    fn bot_user_id(&self) -> u64 {
        self.bot_user_id
    }

    async fn guild_has_role(&self, _guild_id: u64, _role_id: u64) -> bool {
        false
    }

    #[instrument(skip_all)]
    async fn start(&self) -> Void {
        info!("Console host started; type a message and press enter.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let engine = self.engine.lock().clone();
            let Some(engine) = engine else {
                info!("No engine attached; dropping line.");
                continue;
            };

            let message = self.message_from_line(&line);
            let handled = engine.handle_incoming_message(&message).await;
            if !handled {
                println!("(no responder matched)");
            }
        }

        Ok(())
    }

    async fn send_channel(&self, channel_id: u64, outbound: &OutboundMessage) -> Void {
        self.print_outbound(&format!("[#{channel_id}]"), outbound);
        Ok(())
    }

    async fn send_reply(&self, message: &IncomingMessage, outbound: &OutboundMessage) -> Void {
        self.print_outbound(&format!("[#{} reply to {}]", message.channel_id, message.id), outbound);
        Ok(())
    }

    async fn send_dm(&self, user_id: u64, outbound: &OutboundMessage) -> Void {
        self.print_outbound(&format!("[dm @{user_id}]"), outbound);
        Ok(())
    }

    async fn trigger_typing(&self, _channel_id: u64) -> Void {
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Void {
        println!("[#{channel_id}] (deleted message {message_id})");
        Ok(())
    }
}
