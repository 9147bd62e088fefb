//! Resource retrieval from a remote object store.
//!
//! [`extract_id`] pulls a resource identifier out of a shared link,
//! [`ResourceStore`] is the capability the pipeline fetches through, and
//! [`download`] streams a resource to local storage.

pub mod download;
pub mod error;
pub mod extract;
pub mod google;
pub mod store;

pub use {
    download::download,
    error::{Error, Result},
    extract::extract_id,
    google::GoogleDriveStore,
    store::{ByteStream, ResourceId, ResourceMetadata, ResourceStore},
};
