use std::sync::{Arc, PoisonError, RwLock};

use {
    async_trait::async_trait,
    drivelink_channels::{ChannelOutbound, Error, Result},
    drivelink_common::DocumentPayload,
    tracing::debug,
};

use crate::{sidecar::SidecarHandle, types::GatewayMessage};

/// Slot holding the sidecar link once the first account has started.
pub type SharedSidecar = Arc<RwLock<Option<SidecarHandle>>>;

/// Sends messages through the sidecar and waits for each `send_result`.
#[derive(Clone)]
pub struct WhatsAppOutbound {
    sidecar: SharedSidecar,
}

impl WhatsAppOutbound {
    pub fn new(sidecar: SharedSidecar) -> Self {
        Self { sidecar }
    }

    fn handle(&self) -> Result<SidecarHandle> {
        self.sidecar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::not_connected("whatsapp sidecar has not been started"))
    }
}

#[async_trait]
impl ChannelOutbound for WhatsAppOutbound {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()> {
        debug!(account_id, to, len = text.len(), "sending whatsapp text");
        self.handle()?
            .request("send_text", |request_id| GatewayMessage::SendText {
                request_id,
                account_id: account_id.to_string(),
                to: to.to_string(),
                text: text.to_string(),
            })
            .await
    }

    async fn send_document(
        &self,
        account_id: &str,
        to: &str,
        document: &DocumentPayload,
    ) -> Result<()> {
        debug!(account_id, to, file = %document.file_name, "sending whatsapp document");
        self.handle()?
            .request("send_document", |request_id| GatewayMessage::SendDocument {
                request_id,
                account_id: account_id.to_string(),
                to: to.to_string(),
                path: document.path.clone(),
                file_name: document.file_name.clone(),
                mime_type: document.mime_type.clone(),
                caption: document.caption.clone(),
            })
            .await
    }
}
