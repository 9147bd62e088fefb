//! Config schema types (relay pipeline, Drive backing store, WhatsApp channel).
use std::{collections::HashMap, path::PathBuf, time::Duration};

use {
    drivelink_common::mib,
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DrivelinkConfig {
    pub relay: RelayConfig,
    pub drive: DriveConfig,
    pub whatsapp: WhatsAppConfig,
}

/// What to do with a resource whose declared size exceeds the size limit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    /// Refuse the request before any bytes are transferred.
    Reject,
    /// Download, split into parts no larger than the part size, and send each.
    #[default]
    Split,
}

/// What to do with the remaining parts once one part fails to send.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep sending the remaining parts.
    #[default]
    Continue,
    /// Stop at the first failed part.
    Abort,
}

/// Retrieval-and-delivery pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Command token that activates the pipeline, e.g. `.gdrive`.
    pub trigger: String,
    /// Directory downloads and parts are written to.
    pub download_dir: PathBuf,
    /// Largest attachment the channel accepts, in MiB.
    pub size_limit_mb: u64,
    /// Size of each part when splitting, in MiB. Defaults to `size_limit_mb`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_size_mb: Option<u64>,
    pub oversize_policy: OversizePolicy,
    /// Delay after each successful send before the next one (ms).
    pub pacing_ms: u64,
    pub on_part_failure: FailurePolicy,
    /// Give every request its own working directory under `download_dir`.
    pub isolate_requests: bool,
    /// Remove the request's working files once delivery finishes.
    pub cleanup_after_delivery: bool,
    /// MIME type used for parts and for resources without a declared type.
    pub document_mime: String,
}

impl RelayConfig {
    #[must_use]
    pub fn size_limit_bytes(&self) -> u64 {
        mib(self.size_limit_mb)
    }

    #[must_use]
    pub fn part_size_bytes(&self) -> u64 {
        mib(self.part_size_mb.unwrap_or(self.size_limit_mb))
    }

    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            trigger: ".gdrive".into(),
            download_dir: PathBuf::from("./downloads"),
            size_limit_mb: 95,
            part_size_mb: None,
            oversize_policy: OversizePolicy::default(),
            pacing_ms: 3000,
            on_part_failure: FailurePolicy::default(),
            isolate_requests: true,
            cleanup_after_delivery: false,
            document_mime: "application/octet-stream".into(),
        }
    }
}

/// Google Drive v3 backing store.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    /// API key, sufficient for files shared with "anyone with the link".
    pub api_key: Option<Secret<String>>,
    /// OAuth bearer token for private files.
    pub access_token: Option<Secret<String>>,
    /// Limit on establishing a connection. Transfers are not time-bounded.
    pub connect_timeout_secs: u64,
}

impl DriveConfig {
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() || self.access_token.is_some()
    }
}

impl std::fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".into(),
            api_key: None,
            access_token: None,
            connect_timeout_secs: 30,
        }
    }
}

/// WhatsApp Web channel (Baileys sidecar) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// WebSocket URL of the sidecar.
    pub sidecar_url: String,
    /// Upper bound on a single send round-trip through the sidecar.
    pub send_timeout_secs: u64,
    /// Per-account settings keyed by account ID, handed to the plugin as JSON.
    pub accounts: HashMap<String, serde_json::Value>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            sidecar_url: "ws://127.0.0.1:9877".into(),
            send_timeout_secs: 600,
            accounts: HashMap::new(),
        }
    }
}
