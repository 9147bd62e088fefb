use std::sync::LazyLock;

use regex::Regex;

use crate::store::ResourceId;

/// Shortest token treated as a resource identifier.
pub const MIN_ID_LEN: usize = 25;

// ASCII word characters and hyphens. This accepts any sufficiently long
// token, not only real Drive IDs.
static ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!("[-A-Za-z0-9_]{{{MIN_ID_LEN},}}")).ok());

/// Extract the first run of at least [`MIN_ID_LEN`] word/hyphen characters.
///
/// ```
/// use drivelink_drive::extract_id;
///
/// let id = extract_id("https://drive.google.com/file/d/1AbCdEfGhIjKlMnOpQrStUvWxYz/view");
/// assert_eq!(id.unwrap().as_str(), "1AbCdEfGhIjKlMnOpQrStUvWxYz");
/// assert!(extract_id("hi").is_none());
/// ```
#[must_use]
pub fn extract_id(link: &str) -> Option<ResourceId> {
    ID_PATTERN
        .as_ref()?
        .find(link)
        .map(|m| ResourceId::new(m.as_str()))
}
