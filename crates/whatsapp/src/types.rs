//! Wire frames exchanged with the sidecar.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Gateway → sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayMessage {
    Login {
        account_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        auth_dir: Option<PathBuf>,
    },
    Logout {
        account_id: String,
    },
    SendText {
        request_id: String,
        account_id: String,
        to: String,
        text: String,
    },
    /// Upload the file at `path` as a document. The sidecar reads it from
    /// local disk, so both processes must share a filesystem.
    SendDocument {
        request_id: String,
        account_id: String,
        to: String,
        path: PathBuf,
        file_name: String,
        mime_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

/// Sidecar → gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarMessage {
    Qr {
        account_id: String,
        qr: String,
    },
    Connected {
        account_id: String,
        #[serde(default)]
        phone_number: Option<String>,
    },
    Disconnected {
        account_id: String,
        #[serde(default)]
        reason: String,
    },
    LoggedOut {
        account_id: String,
    },
    InboundMessage {
        account_id: String,
        message_id: String,
        chat_jid: String,
        sender_jid: String,
        #[serde(default)]
        sender_name: Option<String>,
        #[serde(default)]
        from_me: bool,
        /// Text or caption; absent for bare media, reactions, receipts.
        #[serde(default)]
        body: Option<String>,
        #[serde(default)]
        timestamp: Option<i64>,
    },
    SendResult {
        request_id: String,
        success: bool,
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    Error {
        #[serde(default)]
        account_id: Option<String>,
        error: String,
    },
}

/// Connection state of one account as last reported by the sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Login sent, no QR code yet.
    WaitingForQr,
    /// QR code waiting to be scanned.
    QrReceived(String),
    Connected { phone_number: Option<String> },
}
