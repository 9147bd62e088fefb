//! Semantic checks on a loaded configuration.

use crate::schema::DrivelinkConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "relay.size_limit_mb"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Check a configuration for values the pipeline cannot run with.
#[must_use]
pub fn validate(config: &DrivelinkConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let relay = &config.relay;

    if relay.trigger.trim().is_empty() {
        result.push(Severity::Error, "relay.trigger", "trigger must not be empty");
    } else if relay.trigger.chars().any(char::is_whitespace) {
        result.push(
            Severity::Error,
            "relay.trigger",
            "trigger must be a single token without whitespace",
        );
    }

    if relay.size_limit_mb == 0 {
        result.push(
            Severity::Error,
            "relay.size_limit_mb",
            "size limit must be at least 1 MB",
        );
    }

    match relay.part_size_mb {
        Some(0) => result.push(
            Severity::Error,
            "relay.part_size_mb",
            "part size must be at least 1 MB",
        ),
        Some(part) if part > relay.size_limit_mb => result.push(
            Severity::Error,
            "relay.part_size_mb",
            format!(
                "part size ({part} MB) exceeds the size limit ({} MB); parts would be rejected by the channel",
                relay.size_limit_mb
            ),
        ),
        _ => {},
    }

    if relay.pacing_ms == 0 {
        result.push(
            Severity::Warning,
            "relay.pacing_ms",
            "no delay between sends; the channel may rate-limit multi-part deliveries",
        );
    }

    if relay.document_mime.trim().is_empty() {
        result.push(
            Severity::Error,
            "relay.document_mime",
            "document MIME type must not be empty",
        );
    }

    if !config.drive.has_credentials() {
        result.push(
            Severity::Warning,
            "drive",
            "neither api_key nor access_token is set; Drive requests will be unauthenticated",
        );
    }

    if config.whatsapp.accounts.is_empty() {
        result.push(
            Severity::Warning,
            "whatsapp.accounts",
            "no WhatsApp accounts configured; nothing will receive commands",
        );
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::schema::{DriveConfig, RelayConfig},
        secrecy::Secret,
    };

    fn valid_config() -> DrivelinkConfig {
        let mut cfg = DrivelinkConfig {
            drive: DriveConfig {
                api_key: Some(Secret::new("key".into())),
                ..Default::default()
            },
            ..Default::default()
        };
        cfg.whatsapp
            .accounts
            .insert("main".into(), serde_json::json!({}));
        cfg
    }

    fn paths(result: &ValidationResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.path.as_str()).collect()
    }

    #[test]
    fn defaults_with_credentials_are_clean() {
        let result = validate(&valid_config());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn bare_defaults_only_warn() {
        let result = validate(&DrivelinkConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 2);
    }

    #[test]
    fn trigger_with_space_is_an_error() {
        let mut cfg = valid_config();
        cfg.relay.trigger = ".g drive".into();
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(paths(&result), vec!["relay.trigger"]);
    }

    #[test]
    fn part_size_larger_than_limit_is_an_error() {
        let mut cfg = valid_config();
        cfg.relay = RelayConfig {
            size_limit_mb: 16,
            part_size_mb: Some(32),
            ..Default::default()
        };
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert!(result.diagnostics[0].message.contains("32 MB"));
    }

    #[test]
    fn zero_limits_are_errors() {
        let mut cfg = valid_config();
        cfg.relay.size_limit_mb = 0;
        cfg.relay.part_size_mb = Some(0);
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 2);
    }

    #[test]
    fn zero_pacing_is_a_warning() {
        let mut cfg = valid_config();
        cfg.relay.pacing_ms = 0;
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(paths(&result), vec!["relay.pacing_ms"]);
        assert_eq!(
            result.diagnostics[0].to_string(),
            "warning: relay.pacing_ms: no delay between sends; the channel may rate-limit multi-part deliveries"
        );
    }
}
