use {
    async_trait::async_trait,
    drivelink_common::DocumentPayload,
    serde::{Deserialize, Serialize},
};

use crate::Result;

// ── Channel events (pub/sub) ────────────────────────────────────────────────

/// Lifecycle and audit events emitted by channel plugins.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelEvent {
    InboundMessage {
        channel_type: String,
        account_id: String,
        peer_id: String,
        sender_name: Option<String>,
        access_granted: bool,
    },
    /// The platform wants a QR code scanned to pair the account.
    PairingCode {
        channel_type: String,
        account_id: String,
        qr: String,
    },
    AccountConnected {
        channel_type: String,
        account_id: String,
        details: Option<String>,
    },
    AccountDisconnected {
        channel_type: String,
        account_id: String,
        reason: String,
    },
}

/// A text message received from a channel.
#[derive(Debug, Clone, Serialize)]
pub struct InboundMessage {
    pub channel_type: String,
    pub account_id: String,
    pub message_id: String,
    /// Conversation the message arrived in; replies go here.
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    /// Sent by the bot's own account.
    pub from_me: bool,
    /// Textual content, absent for media-only messages.
    pub text: Option<String>,
}

impl InboundMessage {
    #[must_use]
    pub fn reply_target(&self) -> ChannelReplyTarget {
        ChannelReplyTarget {
            channel_type: self.channel_type.clone(),
            account_id: self.account_id.clone(),
            chat_id: self.chat_id.clone(),
        }
    }
}

/// Where to send replies back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReplyTarget {
    pub channel_type: String,
    pub account_id: String,
    /// Chat/peer ID to send the reply to.
    pub chat_id: String,
}

/// Sink for channel traffic. The host binary provides the implementation.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    /// Observe a channel event. No-op by default.
    async fn emit(&self, _event: ChannelEvent) {}

    /// Hand an accepted inbound message to the host for processing.
    async fn dispatch_inbound(&self, message: InboundMessage);
}

/// Core channel plugin trait. Each messaging platform implements this.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Channel identifier (e.g. "whatsapp-web").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start an account connection.
    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()>;

    /// Stop an account connection.
    async fn stop_account(&mut self, account_id: &str) -> Result<()>;

    /// Get outbound adapter for sending messages.
    fn outbound(&self) -> Option<&dyn ChannelOutbound>;

    /// Get status adapter for health checks.
    fn status(&self) -> Option<&dyn ChannelStatus>;
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()>;

    /// Upload a local file as a document attachment.
    async fn send_document(
        &self,
        account_id: &str,
        to: &str,
        document: &DocumentPayload,
    ) -> Result<()>;
}

/// Probe channel account health.
#[async_trait]
pub trait ChannelStatus: Send + Sync {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot>;
}

/// Channel health snapshot.
#[derive(Debug, Clone)]
pub struct ChannelHealthSnapshot {
    pub connected: bool,
    pub account_id: String,
    pub details: Option<String>,
}
