//! WhatsApp Web channel plugin for drivelink.
//!
//! Implements `ChannelPlugin` on top of a WhatsApp Web sidecar (a Baileys
//! process running separately) that the plugin talks to over a local
//! WebSocket with JSON frames.

pub mod config;
pub mod outbound;
pub mod plugin;
pub mod sidecar;
pub mod state;
pub mod types;

pub use {
    config::WhatsAppAccountConfig,
    outbound::WhatsAppOutbound,
    plugin::WhatsAppPlugin,
    sidecar::{DEFAULT_SIDECAR_URL, SidecarEvent, SidecarHandle},
};
