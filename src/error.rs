//! Custom error types for vaultdex

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vaultdex operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A labeled code block whose content could not be converted to JSON.
    #[error("ERR_BLOCK_TO_JSON: {path} [{label}]: {message}\n{content}")]
    BlockConversion {
        path: String,
        label: String,
        content: String,
        message: String,
    },

    #[error("Failed to check whether {} exists: {source}", path.display())]
    Existence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A failure scoped to one document
    #[error("{id}: {source}")]
    Document {
        id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("No documents present in the database")]
    EmptyStore,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A YAML value or mapping key with no JSON form
    #[error("{0} cannot be represented in JSON")]
    Unrepresentable(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the store itself can no longer be used,
    /// as opposed to a failure scoped to one document.
    pub fn is_store_unusable(&self) -> bool {
        match self {
            Error::Document { source, .. } => source.is_store_unusable(),
            Error::Database(e) => matches!(
                e,
                sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Configuration(_)
            ),
            _ => false,
        }
    }

    /// Attach a document id, unless the error already names its path
    pub fn in_document(self, id: &str) -> Self {
        match self {
            Error::Read { .. } | Error::BlockConversion { .. } | Error::Document { .. } => self,
            other => Error::Document {
                id: id.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias for vaultdex
pub type Result<T> = std::result::Result<T, Error>;

/// Every error collected while one pipeline stage ran.
#[derive(Debug, Default)]
pub struct StageReport {
    pub stage: &'static str,
    pub errors: Vec<Error>,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, err: Error) {
        self.errors.push(err);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// The stage cannot be trusted if any error says the store is gone.
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(Error::is_store_unusable)
    }

    /// Remove and return the first error that makes the store unusable
    pub fn take_fatal(&mut self) -> Option<Error> {
        let idx = self.errors.iter().position(Error::is_store_unusable)?;
        Some(self.errors.remove(idx))
    }

    /// Error messages prefixed with the stage name, for the run summary.
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", self.stage, e))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_conversion_message_carries_path_and_content() {
        let err = Error::BlockConversion {
            path: "notes/a.md".to_string(),
            label: "!task".to_string(),
            content: "key: [unclosed".to_string(),
            message: "did not find expected ',' or ']'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("ERR_BLOCK_TO_JSON"));
        assert!(msg.contains("notes/a.md"));
        assert!(msg.contains("key: [unclosed"));
    }

    #[test]
    fn test_stage_report_fatality() {
        let mut report = StageReport::new("extract");
        assert!(report.is_clean());

        report.push(Error::Other("bad document".to_string()));
        assert!(!report.is_fatal());

        report.push(Error::Database(sqlx::Error::PoolClosed).in_document("a.md"));
        assert!(report.is_fatal());
        assert_eq!(report.messages().len(), 2);
        assert!(report.messages()[0].starts_with("extract: "));

        let fatal = report.take_fatal().unwrap();
        assert!(fatal.to_string().starts_with("a.md: "));
        assert!(!report.is_fatal());
    }
}
