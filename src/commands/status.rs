//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{IndexCounts, Store};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub counts: IndexCounts,
}

/// Get index status
pub async fn cmd_status(config: &Config, store: &Store) -> Result<StatusInfo> {
    info!("Getting status");

    store.create_schema().await?;
    let counts = store.counts().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        counts,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 vaultdex Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);

    if status.counts.documents == 0 {
        println!("\nIndex is empty. Run 'vaultdex <VAULT>' to index a vault.");
        return;
    }

    println!("\nIndex:");
    println!("  Documents: {}", status.counts.documents);
    println!("  Wikilinks: {}", status.counts.wikilinks);
    println!("  Tags: {}", status.counts.tags);
    println!("  URLs: {}", status.counts.urls);
    println!("  Headings: {}", status.counts.headings);
    println!("  Metadata: {}", status.counts.metadata);
}
