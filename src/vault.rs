//! Vault enumeration and existence checks

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A vault root directory and the rules for which files are documents
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    extensions: Vec<String>,
    trash_dir: String,
}

impl Vault {
    pub fn new(root: &Path, config: &IndexConfig) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| Error::InvalidPath(format!("{}: {}", root.display(), e)))?;

        if !root.is_dir() {
            return Err(Error::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        Ok(Self {
            root,
            extensions: config.extensions.clone(),
            trash_dir: config.trash_dir.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vault-relative ids of every document, sorted, excluding the trash directory
    pub fn list_documents(&self) -> Result<Vec<String>> {
        let trash = self.root.join(&self.trash_dir);
        let mut ids = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.path() != trash);

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable vault entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.is_document(entry.path()) {
                continue;
            }

            if let Some(id) = self.id_for(entry.path()) {
                ids.push(id);
            }
        }

        ids.sort();
        debug!(count = ids.len(), "Enumerated vault documents");
        Ok(ids)
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }

    /// Document id for an absolute path inside the vault, using `/` separators
    pub fn id_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Absolute path of a document id
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Whether the document still exists. I/O failures other than
    /// "not found" are errors, never treated as absence.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::Existence { path, source }),
        }
    }
}
