//! Command-driven retrieval and delivery.
//!
//! The [`Dispatcher`] recognises a trigger command in an inbound message,
//! resolves the linked resource, downloads it, splits it when it is larger
//! than the channel allows, and delivers the result back to the sender with
//! progress and completion messages.

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod messages;
pub mod workspace;

pub use {
    command::{Command, parse_command},
    dispatcher::{Dispatcher, RelaySettings, RequestOutcome, Stage},
    error::RelayError,
};
