//! Index command implementation

use crate::config::Config;
use crate::error::Result;
use crate::extract::Extractor;
use crate::pipeline::{run_pipeline, IndexStats, PipelineOptions};
use crate::store::Store;
use crate::vault::Vault;
use std::path::Path;
use tracing::info;

/// Index a vault into the store
pub async fn cmd_index(
    config: &Config,
    store: &Store,
    vault_path: &Path,
    options: PipelineOptions,
) -> Result<IndexStats> {
    info!("Indexing vault at {}", vault_path.display());

    let vault = Vault::new(vault_path, &config.index)?;
    let extractor = Extractor::new(config.extract.clone());

    store.create_schema().await?;
    run_pipeline(store, &vault, &extractor, &options).await
}

/// Print index statistics to console
pub fn print_index_stats(stats: &IndexStats) {
    println!("\n📥 Indexing Complete\n");
    println!("Documents found: {}", stats.documents_found);
    println!("Documents updated: {}", stats.documents_updated);
    println!("Documents unchanged: {}", stats.documents_cached);
    if stats.documents_failed > 0 {
        println!("Documents failed: {}", stats.documents_failed);
    }
    if stats.documents_removed > 0 {
        println!("Documents removed: {}", stats.documents_removed);
    }
    println!(
        "Degrees updated: {} in, {} out",
        stats.in_degree_rows, stats.out_degree_rows
    );

    if !stats.errors.is_empty() {
        println!("\nErrors:");
        for error in &stats.errors {
            println!("- {}", error);
        }
    }
}
