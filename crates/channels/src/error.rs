use std::{error::Error as StdError, time::Duration};

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across channel traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid channel input: {message}")]
    InvalidInput { message: String },

    /// A requested account ID is not registered.
    #[error("unknown channel account: {account_id}")]
    UnknownAccount { account_id: String },

    /// The transport to the messaging platform is down.
    #[error("channel not connected: {message}")]
    NotConnected { message: String },

    /// The platform reported that a send did not go through.
    #[error("send rejected by channel: {message}")]
    SendRejected { message: String },

    /// No acknowledgement arrived in time.
    #[error("{operation} timed out after {secs}s", secs = .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unknown_account(account_id: impl std::fmt::Display) -> Self {
        Self::UnknownAccount {
            account_id: account_id.to_string(),
        }
    }

    #[must_use]
    pub fn not_connected(message: impl std::fmt::Display) -> Self {
        Self::NotConnected {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn send_rejected(message: impl std::fmt::Display) -> Self {
        Self::SendRejected {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_operation() {
        let err = Error::Timeout {
            operation: "send_document",
            after: Duration::from_secs(600),
        };
        assert_eq!(err.to_string(), "send_document timed out after 600s");
    }
}
