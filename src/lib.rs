//! vaultdex: incremental indexer for linked markdown vaults
//!
//! Documents are hashed, parsed for wikilinks, tags, headings and
//! labeled YAML blocks, and persisted to SQLite. Each run then recomputes
//! the link graph degrees and drops documents whose files are gone.

pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod vault;
