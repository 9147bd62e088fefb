use {
    async_trait::async_trait,
    bytes::Bytes,
    futures::stream::BoxStream,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Chunked byte stream of a resource's content.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Identifier of a resource in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the store declares about a resource before any bytes are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    /// Declared size; drives every threshold decision downstream.
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

/// Capability for reading resources out of a remote object store.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Resolve a resource's name and size.
    async fn fetch_metadata(&self, id: &ResourceId) -> Result<ResourceMetadata>;

    /// Open the resource's content for sequential reading.
    async fn open_read_stream(&self, id: &ResourceId) -> Result<ByteStream>;
}
