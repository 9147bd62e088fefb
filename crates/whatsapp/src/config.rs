use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-account settings, taken from `[whatsapp.accounts.<id>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppAccountConfig {
    /// Where the sidecar keeps this account's session credentials.
    pub auth_dir: Option<PathBuf>,
    /// Sender JIDs allowed to trigger the bot (`*` wildcards). Empty allows all.
    pub allowlist: Vec<String>,
}
