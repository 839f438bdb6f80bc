//! Removal of documents whose files are gone

use super::stats::{Outcome, RunStats};
use crate::error::StageReport;
use crate::store::Store;
use crate::vault::Vault;
use tracing::{info, warn};

/// Delete every stored document whose file no longer exists in the vault.
///
/// Existence-check failures are reported and the document is kept.
pub async fn remove_deleted(store: &Store, vault: &Vault, stats: &RunStats) -> StageReport {
    let mut report = StageReport::new("reconcile");

    let ids = match store.list_document_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            report.push(e);
            return report;
        }
    };

    for id in ids {
        match vault.exists(&id).await {
            Ok(true) => {}
            Ok(false) => match store.delete_document(&id).await {
                Ok(()) => {
                    info!(id = %id, "Removed deleted document");
                    stats.record(Outcome::Removed);
                }
                Err(e) => report.push(e.in_document(&id)),
            },
            Err(e) => {
                warn!("{}", e);
                report.push(e);
            }
        }
    }

    report
}
