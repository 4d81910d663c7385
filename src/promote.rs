use crate::error::ReloadError;
use crate::store::{BlobObjectRef, BlobStore};

/// Result of one promotion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    /// Key of the newest candidate.
    pub winner: String,
    /// Whether the winner was copied over the alias key.
    pub copied: bool,
}

/// Newest object by modification time, ties going to the greatest key.
fn newest(candidates: &[BlobObjectRef]) -> Option<&BlobObjectRef> {
    candidates
        .iter()
        .max_by(|a, b| a.last_modified.cmp(&b.last_modified).then_with(|| a.key.cmp(&b.key)))
}

/// Copy the newest object under `prefix` to `alias_key` unless it already is
/// the alias.
///
/// Nothing is ever deleted. When the alias key lives under `prefix` the copy
/// becomes the newest object, so later passes pick the alias itself and do
/// nothing until a newer candidate arrives.
///
/// # Errors
///
/// [`ReloadError::NoCandidates`] if nothing is stored under `prefix`, or the
/// store's error if listing or copying fails.
pub async fn promote(
    store: &dyn BlobStore,
    prefix: &str,
    alias_key: &str,
) -> Result<Promotion, ReloadError> {
    let candidates = store.list(prefix).await?;
    let winner = newest(&candidates)
        .ok_or_else(|| ReloadError::NoCandidates {
            prefix: prefix.to_owned(),
        })?
        .key
        .clone();

    if winner == alias_key {
        tracing::debug!(alias = alias_key, "alias already holds the newest document");
        return Ok(Promotion {
            winner,
            copied: false,
        });
    }

    store.copy(&winner, alias_key).await?;
    tracing::info!(from = %winner, to = alias_key, "promoted newest rule document");
    Ok(Promotion {
        winner,
        copied: true,
    })
}
