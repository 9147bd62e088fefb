//! WhatsApp Web channel plugin implementation.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use {
    async_trait::async_trait,
    drivelink_channels::{
        ChannelEvent, ChannelEventSink, ChannelHealthSnapshot, ChannelOutbound, ChannelPlugin,
        ChannelStatus, InboundMessage, Result, gating,
    },
    tracing::{debug, info, warn},
};

use crate::{
    config::WhatsAppAccountConfig,
    outbound::{SharedSidecar, WhatsAppOutbound},
    sidecar::{DEFAULT_SIDECAR_URL, EventCallback, SidecarEvent, SidecarHandle},
    state::{self, AccountState, AccountStateMap},
    types::{ConnectionState, SidecarMessage},
};

/// Channel type reported on events and reply targets.
pub const CHANNEL_TYPE: &str = "whatsapp";

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(600);

/// WhatsApp Web channel plugin (via Baileys sidecar).
pub struct WhatsAppPlugin {
    accounts: AccountStateMap,
    outbound: WhatsAppOutbound,
    sidecar: SharedSidecar,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
    sidecar_url: String,
    send_timeout: Duration,
}

impl WhatsAppPlugin {
    pub fn new() -> Self {
        let sidecar: SharedSidecar = Arc::new(RwLock::new(None));
        let outbound = WhatsAppOutbound::new(Arc::clone(&sidecar));
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            outbound,
            sidecar,
            event_sink: None,
            sidecar_url: DEFAULT_SIDECAR_URL.to_string(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_sidecar_url(mut self, url: impl Into<String>) -> Self {
        self.sidecar_url = url.into();
        self
    }

    /// How long a send waits for the sidecar to confirm it.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Get a shared reference to the outbound sender.
    pub fn shared_outbound(&self) -> Arc<dyn ChannelOutbound> {
        Arc::new(self.outbound.clone())
    }

    /// List all active account IDs.
    pub fn account_ids(&self) -> Vec<String> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        accounts.keys().cloned().collect()
    }

    /// Get the connection state for an account.
    pub fn connection_state(&self, account_id: &str) -> Option<ConnectionState> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        accounts.get(account_id).map(|s| s.connection_state.clone())
    }

    /// Close the sidecar link. Accounts stay registered.
    pub fn shutdown(&self) {
        let mut slot = self.sidecar.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.shutdown();
        }
    }

    /// Return the sidecar link, starting it on first use.
    fn ensure_sidecar(&self) -> SidecarHandle {
        let mut slot = self.sidecar.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref() {
            return handle.clone();
        }

        let accounts = Arc::clone(&self.accounts);
        let event_sink = self.event_sink.clone();
        let callback: EventCallback = Arc::new(move |event| {
            handle_sidecar_event(event, &accounts, event_sink.as_ref());
        });
        let handle = SidecarHandle::spawn(self.sidecar_url.clone(), self.send_timeout, callback);
        *slot = Some(handle.clone());
        handle
    }
}

impl Default for WhatsAppPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelPlugin for WhatsAppPlugin {
    fn id(&self) -> &str {
        "whatsapp-web"
    }

    fn name(&self) -> &str {
        "WhatsApp Web"
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()> {
        let wa_config: WhatsAppAccountConfig = serde_json::from_value(config)?;

        info!(account_id, "starting whatsapp web account");

        let auth_dir = wa_config.auth_dir.clone();
        {
            let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
            accounts.insert(account_id.to_string(), AccountState {
                account_id: account_id.to_string(),
                config: wa_config,
                connection_state: ConnectionState::WaitingForQr,
            });
        }

        self.ensure_sidecar().login(account_id, auth_dir).await
    }

    async fn stop_account(&mut self, account_id: &str) -> Result<()> {
        let removed = {
            let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
            accounts.remove(account_id).is_some()
        };

        if !removed {
            warn!(account_id, "whatsapp web account not found");
            return Ok(());
        }

        let handle = self
            .sidecar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handle) = handle
            && let Err(e) = handle.logout(account_id).await
        {
            warn!(account_id, error = %e, "failed to send logout to sidecar");
        }
        info!(account_id, "stopped whatsapp web account");
        Ok(())
    }

    fn outbound(&self) -> Option<&dyn ChannelOutbound> {
        Some(&self.outbound)
    }

    fn status(&self) -> Option<&dyn ChannelStatus> {
        Some(self)
    }
}

#[async_trait]
impl ChannelStatus for WhatsAppPlugin {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot> {
        let (connected, details) = match self.connection_state(account_id) {
            Some(ConnectionState::Connected { phone_number }) => {
                (true, phone_number.map(|p| format!("Phone: {p}")))
            },
            Some(ConnectionState::QrReceived(_)) => {
                (false, Some("waiting for QR code scan".into()))
            },
            Some(ConnectionState::WaitingForQr) => (false, Some("generating QR code".into())),
            Some(ConnectionState::Disconnected) | None => (false, Some("disconnected".into())),
        };
        Ok(ChannelHealthSnapshot {
            connected,
            account_id: account_id.to_string(),
            details,
        })
    }
}

fn emit(sink: Option<&Arc<dyn ChannelEventSink>>, event: ChannelEvent) {
    if let Some(sink) = sink {
        let sink = Arc::clone(sink);
        tokio::spawn(async move {
            sink.emit(event).await;
        });
    }
}

/// Handle an event from the sidecar link.
fn handle_sidecar_event(
    event: SidecarEvent,
    accounts: &AccountStateMap,
    event_sink: Option<&Arc<dyn ChannelEventSink>>,
) {
    let msg = match event {
        SidecarEvent::LinkUp => {
            debug!("sidecar link up");
            return;
        },
        SidecarEvent::LinkDown => {
            warn!("sidecar link down, marking accounts disconnected");
            state::disconnect_all(accounts);
            return;
        },
        SidecarEvent::Message(msg) => msg,
    };

    match msg {
        SidecarMessage::Qr { account_id, qr } => {
            debug!(account_id, "received QR code from sidecar");
            state::set_connection_state(
                accounts,
                &account_id,
                ConnectionState::QrReceived(qr.clone()),
            );
            emit(event_sink, ChannelEvent::PairingCode {
                channel_type: CHANNEL_TYPE.into(),
                account_id,
                qr,
            });
        },
        SidecarMessage::Connected {
            account_id,
            phone_number,
        } => {
            info!(account_id, ?phone_number, "whatsapp web connected");
            state::set_connection_state(accounts, &account_id, ConnectionState::Connected {
                phone_number: phone_number.clone(),
            });
            emit(event_sink, ChannelEvent::AccountConnected {
                channel_type: CHANNEL_TYPE.into(),
                account_id,
                details: phone_number,
            });
        },
        SidecarMessage::Disconnected { account_id, reason } => {
            warn!(account_id, reason, "whatsapp web disconnected");
            state::set_connection_state(accounts, &account_id, ConnectionState::Disconnected);
            emit(event_sink, ChannelEvent::AccountDisconnected {
                channel_type: CHANNEL_TYPE.into(),
                account_id,
                reason,
            });
        },
        SidecarMessage::LoggedOut { account_id } => {
            info!(account_id, "whatsapp web logged out");
            state::set_connection_state(accounts, &account_id, ConnectionState::Disconnected);
            emit(event_sink, ChannelEvent::AccountDisconnected {
                channel_type: CHANNEL_TYPE.into(),
                account_id,
                reason: "logged out".into(),
            });
        },
        SidecarMessage::InboundMessage {
            account_id,
            message_id,
            chat_jid,
            sender_jid,
            sender_name,
            from_me,
            body,
            timestamp: _,
        } => {
            let Some(config) =
                state::with_account(accounts, &account_id, |s| s.config.clone())
            else {
                debug!(account_id, "inbound message for unknown account");
                return;
            };
            let access_granted = gating::is_allowed(&sender_jid, &config.allowlist);
            debug!(account_id, sender_jid, from_me, access_granted, "received inbound message");

            emit(event_sink, ChannelEvent::InboundMessage {
                channel_type: CHANNEL_TYPE.into(),
                account_id: account_id.clone(),
                peer_id: sender_jid.clone(),
                sender_name: sender_name.clone(),
                access_granted,
            });

            if from_me || body.is_none() || !access_granted {
                return;
            }
            let Some(sink) = event_sink else {
                return;
            };
            let message = InboundMessage {
                channel_type: CHANNEL_TYPE.into(),
                account_id,
                message_id,
                chat_id: chat_jid,
                sender_id: sender_jid,
                sender_name,
                from_me,
                text: body,
            };
            let sink = Arc::clone(sink);
            tokio::spawn(async move {
                sink.dispatch_inbound(message).await;
            });
        },
        SidecarMessage::SendResult { request_id, .. } => {
            debug!(request_id, "uncorrelated send result");
        },
        SidecarMessage::Error { account_id, error } => {
            warn!(?account_id, error, "sidecar error");
        },
    }
}
