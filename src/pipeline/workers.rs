//! Bounded worker pool for the extraction stage

use super::change::{detect_change, Change};
use super::stats::{Outcome, RunStats};
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::store::Store;
use crate::vault::Vault;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Everything a worker needs to process a document
struct WorkerContext {
    store: Store,
    vault: Vault,
    extractor: Extractor,
    stats: Arc<RunStats>,
    progress: Option<ProgressBar>,
}

/// Extraction workers manager
pub struct ExtractWorkers {
    count: usize,
    context: Arc<WorkerContext>,
}

impl ExtractWorkers {
    pub fn new(
        count: usize,
        store: Store,
        vault: Vault,
        extractor: Extractor,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            count: count.max(1),
            context: Arc::new(WorkerContext {
                store,
                vault,
                extractor,
                stats,
                progress: None,
            }),
        }
    }

    /// Advance `progress` once per processed document
    pub fn with_progress(mut self, progress: Option<ProgressBar>) -> Self {
        if let Some(ctx) = Arc::get_mut(&mut self.context) {
            ctx.progress = progress;
        }
        self
    }

    /// Process every id with `count` concurrent workers.
    ///
    /// The returned channel yields every error from every worker and closes
    /// only once all workers have exited. Must be called inside a Tokio runtime.
    pub fn start(self, ids: Vec<String>) -> mpsc::UnboundedReceiver<Error> {
        let (job_tx, job_rx) = flume::bounded::<String>(self.count);
        let (err_tx, err_rx) = mpsc::unbounded_channel();

        // feed every id, then close the job channel by dropping the sender
        tokio::spawn(async move {
            for id in ids {
                if job_tx.send_async(id).await.is_err() {
                    break;
                }
            }
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.count {
            let jobs = job_rx.clone();
            let errors = err_tx.clone();
            let ctx = Arc::clone(&self.context);

            workers.spawn(async move {
                while let Ok(id) = jobs.recv_async().await {
                    let outcome = match process_document(&ctx, &id).await {
                        Ok((outcome, rejected)) => {
                            for err in rejected {
                                warn!("{}", err);
                                let _ = errors.send(err);
                            }
                            outcome
                        }
                        Err(err) => {
                            let err = err.in_document(&id);
                            warn!("{}", err);
                            let _ = errors.send(err);
                            Outcome::Failed
                        }
                    };

                    ctx.stats.record(outcome);
                    if let Some(pb) = &ctx.progress {
                        pb.inc(1);
                    }
                }
                debug!(worker_id, "Extract worker finished");
            });
        }
        drop(job_rx);

        // barrier: the error channel closes when the last sender goes away
        tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    let _ = err_tx.send(Error::Worker(e));
                }
            }
        });

        err_rx
    }
}

/// Read, detect change, extract and persist one document.
///
/// Returns the outcome plus any labeled blocks that were skipped.
async fn process_document(ctx: &WorkerContext, id: &str) -> Result<(Outcome, Vec<Error>)> {
    let path = ctx.vault.path_for(id);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| Error::Read { path, source })?;

    let hash = match detect_change(&ctx.store, id, &bytes).await? {
        Change::Unchanged => {
            debug!(id = %id, "Document unchanged");
            return Ok((Outcome::Cached, Vec::new()));
        }
        Change::Changed { hash } => hash,
    };

    let text = String::from_utf8_lossy(&bytes);
    let extraction = ctx.extractor.extract(id, &text, hash);

    ctx.store
        .write_document(
            &extraction.facts,
            &ctx.extractor.config().front_matter_schema,
        )
        .await?;

    debug!(
        id = %id,
        wikilinks = extraction.facts.wikilinks.len(),
        tags = extraction.facts.tags.len(),
        "Document updated"
    );

    Ok((Outcome::Updated, extraction.rejected))
}
