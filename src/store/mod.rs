//! Object storage the rule documents are read from.
//!
//! [`BlobStore`] is the seam to the outside world: a flat key space with
//! list, head, get and copy. Two implementations ship with the crate:
//! [`MemoryBlobStore`] for embedding and tests, and [`DirBlobStore`] which
//! treats a local directory as a bucket.

mod dir;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use dir::DirBlobStore;
pub use memory::{MemoryBlobStore, StoreCalls};

/// An object as listed under a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObjectRef {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    /// Only filled in by stores that know it without reading the object.
    pub version_tag: Option<String>,
}

/// Raw bytes of a fetched document and the version they were read at.
#[derive(Debug, Clone)]
pub struct RuleDocument {
    pub bytes: Vec<u8>,
    pub version_tag: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("invalid object key: {key}")]
    InvalidKey { key: String },

    #[error("blob store unavailable: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Version tag derived from object contents. Copies keep it.
pub(crate) fn content_tag(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObjectRef>, StoreError>;

    /// Current version tag of `key`.
    async fn head(&self, key: &str) -> Result<String, StoreError>;

    async fn get(&self, key: &str) -> Result<RuleDocument, StoreError>;

    /// Copy `src` over `dest`, creating or replacing it.
    async fn copy(&self, src: &str, dest: &str) -> Result<(), StoreError>;
}
