//! Shared types and small utilities used across the drivelink crates.

pub mod types;

pub use types::{DocumentPayload, format_size, mib};
