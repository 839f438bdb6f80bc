//! Content-hash change detection

use crate::error::Result;
use crate::extract::hash_content;
use crate::store::Store;

/// Whether a document needs re-extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The stored hash matches; the store already reflects this content
    Unchanged,
    /// New or modified content, with its freshly computed hash
    Changed { hash: String },
}

impl Change {
    pub fn is_changed(&self) -> bool {
        matches!(self, Change::Changed { .. })
    }
}

/// Hash `bytes` once and compare with the hash stored for `id`.
/// An unknown document counts as changed.
pub async fn detect_change(store: &Store, id: &str, bytes: &[u8]) -> Result<Change> {
    let hash = hash_content(bytes);
    match store.get_content_hash(id).await? {
        Some(stored) if stored == hash => Ok(Change::Unchanged),
        _ => Ok(Change::Changed { hash }),
    }
}
