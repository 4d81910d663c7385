use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{BlobObjectRef, BlobStore, RuleDocument, StoreError, content_tag};

#[derive(Debug, Clone)]
struct Object {
    bytes: Vec<u8>,
    last_modified: DateTime<Utc>,
    version_tag: String,
}

/// How many times each operation has been called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub list: usize,
    pub head: usize,
    pub get: usize,
    pub copy: usize,
}

/// In-process [`BlobStore`].
///
/// Counts calls per operation and can be switched offline, in which case
/// every operation fails with [`StoreError::Transport`] (calls are still
/// counted).
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, Object>>,
    offline: AtomicBool,
    list_calls: AtomicUsize,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
    copy_calls: AtomicUsize,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `key`, modified now.
    pub fn put(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.put_at(key, bytes, Utc::now());
    }

    /// Store `bytes` under `key` with an explicit modification time.
    pub fn put_at(&self, key: &str, bytes: impl Into<Vec<u8>>, last_modified: DateTime<Utc>) {
        let bytes = bytes.into();
        let version_tag = content_tag(&bytes);
        self.objects().insert(
            key.to_owned(),
            Object {
                bytes,
                last_modified,
                version_tag,
            },
        );
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            list: self.list_calls.load(Ordering::SeqCst),
            head: self.head_calls.load(Ordering::SeqCst),
            get: self.get_calls.load(Ordering::SeqCst),
            copy: self.copy_calls.load(Ordering::SeqCst),
        }
    }

    /// Bytes stored under `key`, bypassing the call counters.
    #[must_use]
    pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.objects().get(key).map(|o| o.bytes.clone())
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, Object>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, counter: &AtomicUsize) -> Result<(), StoreError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("memory store is offline".into()));
        }
        Ok(())
    }

    fn lookup(&self, key: &str) -> Result<Object, StoreError> {
        self.objects()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: key.to_owned() })
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObjectRef>, StoreError> {
        self.enter(&self.list_calls)?;
        Ok(self
            .objects()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| BlobObjectRef {
                key: key.clone(),
                last_modified: o.last_modified,
                version_tag: Some(o.version_tag.clone()),
            })
            .collect())
    }

    async fn head(&self, key: &str) -> Result<String, StoreError> {
        self.enter(&self.head_calls)?;
        self.lookup(key).map(|o| o.version_tag)
    }

    async fn get(&self, key: &str) -> Result<RuleDocument, StoreError> {
        self.enter(&self.get_calls)?;
        let o = self.lookup(key)?;
        Ok(RuleDocument {
            bytes: o.bytes,
            version_tag: o.version_tag,
        })
    }

    async fn copy(&self, src: &str, dest: &str) -> Result<(), StoreError> {
        self.enter(&self.copy_calls)?;
        let mut copied = self.lookup(src)?;
        // The copy is a new write; never older than its source.
        copied.last_modified = copied.last_modified.max(Utc::now());
        self.objects().insert(dest.to_owned(), copied);
        Ok(())
    }
}
