use std::error::Error as StdError;

use drivelink_drive::Error as StoreError;

/// Why a request was aborted. Each variant maps to exactly one reply.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No identifier could be extracted from the command argument.
    #[error("no resource identifier in {link:?}")]
    InvalidIdentifier { link: Option<String> },

    /// The backing store could not resolve the identifier or refused access.
    #[error("metadata lookup failed: {0}")]
    Metadata(#[source] StoreError),

    /// The backing store was unreachable or the byte stream broke.
    #[error("transfer failed: {0}")]
    Transport(#[source] StoreError),

    /// Reading or writing local files failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Declared size is above the limit and the policy forbids splitting.
    #[error("resource is {size_bytes} bytes, above the {limit_bytes} byte limit")]
    ThresholdRejection { size_bytes: u64, limit_bytes: u64 },
}

impl RelayError {
    #[must_use]
    pub fn io(context: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Io {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Classify a failed metadata lookup.
    #[must_use]
    pub fn from_lookup(err: StoreError) -> Self {
        if err.is_metadata_failure() {
            Self::Metadata(err)
        } else {
            Self::Transport(err)
        }
    }

    /// Classify a failed download; local write failures are I/O, the rest
    /// are transport.
    #[must_use]
    pub fn from_download(err: StoreError) -> Self {
        match err {
            StoreError::Io { context, source } => Self::io(context, source),
            other => Self::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_classification() {
        let not_found = RelayError::from_lookup(StoreError::NotFound { id: "x".into() });
        assert!(matches!(not_found, RelayError::Metadata(_)));

        let broken = RelayError::from_lookup(StoreError::stream(std::io::Error::other("reset")));
        assert!(matches!(broken, RelayError::Transport(_)));
    }

    #[test]
    fn download_write_failure_is_io() {
        let err = RelayError::from_download(StoreError::io(
            "writing chunk",
            std::io::Error::other("disk full"),
        ));
        assert!(matches!(err, RelayError::Io { .. }));
        assert_eq!(err.to_string(), "writing chunk: disk full");
    }
}
