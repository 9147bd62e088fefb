//! Configuration loading, env substitution, and validation.
//!
//! Config files: `drivelink.toml`, `drivelink.yaml`, or `drivelink.json`
//! Searched in `./` then `~/.config/drivelink/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, find_config_file, load_config, load_or_default},
    schema::{
        DriveConfig, DrivelinkConfig, FailurePolicy, OversizePolicy, RelayConfig, WhatsAppConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
