use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{BlobObjectRef, BlobStore, RuleDocument, StoreError, content_tag};

/// A local directory used as a bucket.
///
/// Keys are `/`-separated paths relative to the root. The version tag of an
/// object is the BLAKE3 hash of its contents. Hashes are remembered per file
/// together with its modification time and length, so [`head`](BlobStore::head)
/// only reads metadata while a file is left alone. A rewrite that keeps both
/// the length and the modification time is not noticed by `head` until the
/// next `get`.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
    tags: Arc<Mutex<HashMap<PathBuf, CachedTag>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: SystemTime,
    len: u64,
}

impl Stamp {
    fn of(meta: &std::fs::Metadata) -> Result<Self, StoreError> {
        Ok(Self {
            modified: meta.modified()?,
            len: meta.len(),
        })
    }
}

#[derive(Debug)]
struct CachedTag {
    stamp: Stamp,
    tag: String,
}

impl DirBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tags: Arc::default(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !plain {
            return Err(StoreError::InvalidKey { key: key.to_owned() });
        }
        Ok(self.root.join(relative))
    }

    async fn stamp(path: &Path, key: &str) -> Result<Stamp, StoreError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| not_found(e, key))?;
        Stamp::of(&meta)
    }

    fn cached(&self, path: &Path, stamp: Stamp) -> Option<String> {
        let tags = self.tags.lock().unwrap_or_else(PoisonError::into_inner);
        let tag = tags
            .get(path)
            .filter(|cached| cached.stamp == stamp)
            .map(|cached| cached.tag.clone());
        tag
    }

    /// Hash `bytes` and remember the tag under `stamp`. The stamp must be
    /// taken before the bytes were read.
    fn remember(&self, path: PathBuf, stamp: Stamp, bytes: &[u8]) -> String {
        let tag = content_tag(bytes);
        let mut tags = self.tags.lock().unwrap_or_else(PoisonError::into_inner);
        tags.insert(path, CachedTag { stamp, tag: tag.clone() });
        tag
    }

    async fn read(&self, key: &str) -> Result<(Vec<u8>, String), StoreError> {
        let path = self.path_of(key)?;
        let stamp = Self::stamp(&path, key).await?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| not_found(e, key))?;
        let tag = self.remember(path, stamp, &bytes);
        Ok((bytes, tag))
    }
}

fn not_found(err: std::io::Error, key: &str) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound { key: key.to_owned() }
    } else {
        StoreError::Io(err)
    }
}

fn key_of(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

#[async_trait]
impl BlobStore for DirBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObjectRef>, StoreError> {
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                let path = entry.path();
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(key) = key_of(&self.root, &path) else {
                    tracing::debug!(path = %path.display(), "skipping non UTF-8 path");
                    continue;
                };
                if key.starts_with(prefix) {
                    found.push(BlobObjectRef {
                        key,
                        last_modified: DateTime::<Utc>::from(meta.modified()?),
                        version_tag: None,
                    });
                }
            }
        }

        found.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(found)
    }

    async fn head(&self, key: &str) -> Result<String, StoreError> {
        let path = self.path_of(key)?;
        let stamp = Self::stamp(&path, key).await?;
        if let Some(tag) = self.cached(&path, stamp) {
            return Ok(tag);
        }
        let (_, tag) = self.read(key).await?;
        Ok(tag)
    }

    async fn get(&self, key: &str) -> Result<RuleDocument, StoreError> {
        let (bytes, version_tag) = self.read(key).await?;
        Ok(RuleDocument { bytes, version_tag })
    }

    async fn copy(&self, src: &str, dest: &str) -> Result<(), StoreError> {
        let from = self.path_of(src)?;
        let to = self.path_of(dest)?;
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&from, &to)
            .await
            .map_err(|e| not_found(e, src))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_nested_keys_with_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("rules/archive")).unwrap();
        std::fs::write(dir.path().join("rules/a.xlsx"), b"a").unwrap();
        std::fs::write(dir.path().join("rules/archive/b.xlsx"), b"b").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"r").unwrap();

        let store = DirBlobStore::new(dir.path());
        let keys: Vec<String> = store
            .list("rules/")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(keys, vec!["rules/a.xlsx", "rules/archive/b.xlsx"]);
    }

    #[tokio::test]
    async fn copy_creates_parents_and_keeps_tag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xlsx"), b"payload").unwrap();

        let store = DirBlobStore::new(dir.path());
        store.copy("a.xlsx", "rules/latest.xlsx").await.unwrap();
        assert_eq!(
            store.head("rules/latest.xlsx").await.unwrap(),
            store.head("a.xlsx").await.unwrap()
        );
        let doc = store.get("rules/latest.xlsx").await.unwrap();
        assert_eq!(doc.bytes, b"payload");
    }

    #[tokio::test]
    async fn head_reuses_hash_while_metadata_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.xlsx");
        std::fs::write(&path, b"payload-one").unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

        let store = DirBlobStore::new(dir.path());
        let first = store.head("a.xlsx").await.unwrap();
        assert_eq!(first, content_tag(b"payload-one"));

        // Same length, modification time put back: head trusts the metadata.
        std::fs::write(&path, b"payload-two").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
        assert_eq!(store.head("a.xlsx").await.unwrap(), first);

        // A fetch always hashes what it read and refreshes the entry.
        let doc = store.get("a.xlsx").await.unwrap();
        assert_eq!(doc.version_tag, content_tag(b"payload-two"));
        assert_eq!(store.head("a.xlsx").await.unwrap(), doc.version_tag);
    }

    #[tokio::test]
    async fn head_sees_rewritten_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.xlsx");
        std::fs::write(&path, b"v1").unwrap();

        let store = DirBlobStore::new(dir.path());
        assert_eq!(store.head("a.xlsx").await.unwrap(), content_tag(b"v1"));

        std::fs::write(&path, b"version two").unwrap();
        assert_eq!(store.head("a.xlsx").await.unwrap(), content_tag(b"version two"));
    }

    #[tokio::test]
    async fn head_of_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirBlobStore::new(dir.path());
        assert!(matches!(
            store.head("rules/missing.xlsx").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirBlobStore::new(dir.path());
        assert!(matches!(
            store.get("../etc/passwd").await,
            Err(StoreError::InvalidKey { .. })
        ));
        assert!(matches!(
            store.get("missing.xlsx").await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
