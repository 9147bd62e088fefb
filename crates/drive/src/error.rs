use std::error::Error as StdError;

/// Crate-wide result type for backing-store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resource {id} was not found")]
    NotFound { id: String },

    #[error("access to resource {id} was denied")]
    AccessDenied { id: String },

    /// The store rejected our credentials (HTTP 401).
    #[error("credentials were rejected while accessing resource {id}")]
    Unauthorized { id: String },

    #[error("resource {id} cannot be downloaded: {reason}")]
    NotDownloadable { id: String, reason: String },

    #[error("backing store returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The byte stream failed after the transfer had started.
    #[error("download stream failed: {source}")]
    Stream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metadata response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn stream(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Stream {
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The store answered, but could not resolve the identifier or refused it.
    #[must_use]
    pub fn is_metadata_failure(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AccessDenied { .. }
                | Self::Unauthorized { .. }
                | Self::NotDownloadable { .. }
        )
    }

    /// Short reason fit for a chat reply: no response bodies, no identifiers.
    #[must_use]
    pub fn brief(&self) -> String {
        match self {
            Self::NotFound { .. } => "file not found".into(),
            Self::AccessDenied { .. } => "access denied".into(),
            Self::Unauthorized { .. } => "credentials rejected".into(),
            Self::NotDownloadable { reason, .. } => reason.clone(),
            Self::Status { status, .. } => format!("Google Drive answered HTTP {status}"),
            Self::Http(e) if e.is_timeout() => "request timed out".into(),
            Self::Http(e) if e.is_connect() => "could not connect to Google Drive".into(),
            Self::Http(_) => "network error".into(),
            Self::Stream { .. } => "connection dropped during the transfer".into(),
            Self::Io { context, source } => format!("{context}: {source}"),
            Self::Decode(_) => "unexpected response from Google Drive".into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(Error::NotFound { id: "x".into() }, true)]
    #[case(Error::AccessDenied { id: "x".into() }, true)]
    #[case(Error::Unauthorized { id: "x".into() }, true)]
    #[case(Error::stream(std::io::Error::other("reset")), false)]
    fn metadata_failure_classification(#[case] err: Error, #[case] expected: bool) {
        assert_eq!(err.is_metadata_failure(), expected);
    }

    #[test]
    fn brief_omits_response_body() {
        let err = Error::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "<html>backend error page</html>".into(),
        };
        assert_eq!(err.brief(), "Google Drive answered HTTP 503 Service Unavailable");
    }
}
