use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Bytes in one mebibyte.
const MIB: u64 = 1024 * 1024;

/// Convert a whole number of mebibytes to bytes, saturating at `u64::MAX`.
#[must_use]
pub const fn mib(n: u64) -> u64 {
    n.saturating_mul(MIB)
}

/// Render a byte count the way users see it in chat replies, e.g. `"95.00 MB"`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MIB as f64)
}

/// A local file to be delivered as a document attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    /// Path on local storage the channel reads the bytes from.
    pub path: PathBuf,
    /// File name shown to the recipient.
    pub file_name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl DocumentPayload {
    pub fn new(
        path: impl Into<PathBuf>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            caption: None,
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(0, "0.00 MB")]
    #[case(1_048_576, "1.00 MB")]
    #[case(1_000_000, "0.95 MB")]
    #[case(300_000_000, "286.10 MB")]
    #[case(mib(95), "95.00 MB")]
    fn human_sizes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_size(bytes), expected);
    }

    #[test]
    fn mib_saturates() {
        assert_eq!(mib(95), 99_614_720);
        assert_eq!(mib(u64::MAX), u64::MAX);
    }

    #[test]
    fn caption_is_omitted_when_absent() {
        let doc = DocumentPayload::new("/tmp/a.bin", "a.bin", "application/octet-stream");
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("caption").is_none());

        let doc = doc.with_caption("Part 1/2");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["caption"], "Part 1/2");
    }
}
