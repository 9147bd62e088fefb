//! Channel plugin system.
//!
//! Each messaging platform implements the [`ChannelPlugin`] trait and exposes
//! a [`ChannelOutbound`] adapter for text and document delivery. Inbound
//! messages are pushed into a [`ChannelEventSink`] supplied by the host.

pub mod error;
pub mod gating;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{
        ChannelEvent, ChannelEventSink, ChannelHealthSnapshot, ChannelOutbound, ChannelPlugin,
        ChannelReplyTarget, ChannelStatus, InboundMessage,
    },
};
