use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use {
    anyhow::Context,
    async_trait::async_trait,
    drivelink_channels::{ChannelEvent, ChannelEventSink, ChannelPlugin, InboundMessage},
    drivelink_config::DrivelinkConfig,
    drivelink_drive::GoogleDriveStore,
    drivelink_relay::{Dispatcher, RelaySettings},
    drivelink_whatsapp::WhatsAppPlugin,
    tracing::{info, warn},
};

use crate::config_commands::print_diagnostics;

/// Routes channel traffic into the relay. The dispatcher is attached after
/// the plugin exists, since it sends through the plugin's outbound.
#[derive(Default)]
struct RelaySink {
    dispatcher: OnceLock<Arc<Dispatcher>>,
}

#[async_trait]
impl ChannelEventSink for RelaySink {
    async fn emit(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::PairingCode { account_id, qr, .. } => {
                info!(%account_id, "scan the QR code with WhatsApp > Linked devices");
                eprintln!("\n{qr}\n");
            },
            ChannelEvent::AccountConnected {
                account_id,
                details,
                ..
            } => info!(%account_id, details = ?details, "account connected"),
            ChannelEvent::AccountDisconnected {
                account_id, reason, ..
            } => warn!(%account_id, %reason, "account disconnected"),
            ChannelEvent::InboundMessage {
                account_id,
                peer_id,
                access_granted: false,
                ..
            } => info!(%account_id, %peer_id, "ignoring message from sender not in allowlist"),
            ChannelEvent::InboundMessage { .. } => {},
        }
    }

    async fn dispatch_inbound(&self, message: InboundMessage) {
        let Some(dispatcher) = self.dispatcher.get() else {
            warn!(message_id = %message.message_id, "relay not ready, dropping message");
            return;
        };
        let dispatcher = Arc::clone(dispatcher);
        tokio::spawn(async move {
            dispatcher.handle(&message).await;
        });
    }
}

pub async fn run(config: DrivelinkConfig) -> anyhow::Result<()> {
    let validation = drivelink_config::validate(&config);
    if !validation.diagnostics.is_empty() {
        print_diagnostics(&validation);
    }
    if validation.has_errors() {
        anyhow::bail!("invalid configuration, run `drivelink validate` for details");
    }
    if config.whatsapp.accounts.is_empty() {
        anyhow::bail!("no WhatsApp accounts configured under [whatsapp.accounts]");
    }

    let store = Arc::new(GoogleDriveStore::new(&config.drive).context("building Drive client")?);
    let sink = Arc::new(RelaySink::default());
    let mut plugin = WhatsAppPlugin::new()
        .with_sidecar_url(config.whatsapp.sidecar_url.clone())
        .with_send_timeout(Duration::from_secs(config.whatsapp.send_timeout_secs))
        .with_event_sink(Arc::clone(&sink) as Arc<dyn ChannelEventSink>);

    let settings = RelaySettings::from_config(&config.relay);
    info!(
        trigger = %settings.trigger,
        download_dir = %settings.download_dir.display(),
        "relay configured"
    );
    let dispatcher = Dispatcher::new(store, plugin.shared_outbound(), settings);
    if sink.dispatcher.set(Arc::new(dispatcher)).is_err() {
        anyhow::bail!("relay dispatcher attached twice");
    }

    for (account_id, account_config) in &config.whatsapp.accounts {
        plugin
            .start_account(account_id, account_config.clone())
            .await
            .with_context(|| format!("starting WhatsApp account {account_id}"))?;
    }
    info!(
        accounts = config.whatsapp.accounts.len(),
        sidecar = %config.whatsapp.sidecar_url,
        "waiting for messages, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;

    // Closing the link leaves the sidecar sessions paired; stop_account would
    // log the device out.
    info!("shutting down");
    plugin.shutdown();
    Ok(())
}
