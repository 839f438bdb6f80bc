//! Incremental indexing pipeline
//!
//! A run has three stages, each drained completely before the next starts:
//! 1. Extract: a bounded worker pool reads every document, skips the ones
//!    whose content hash is unchanged and persists facts for the rest.
//! 2. Graph: in-degree and out-degree are recomputed for the whole vault.
//! 3. Reconcile: documents whose files are gone are removed.
//!
//! Per-document failures are collected and returned in the run summary.
//! The run only aborts when the store is unusable or the graph stage fails.

mod change;
mod graph;
mod reconcile;
mod stats;
mod workers;

pub use change::{detect_change, Change};
pub use graph::update_degrees;
pub use reconcile::remove_deleted;
pub use stats::{IndexStats, Outcome, RunStats};
pub use workers::ExtractWorkers;

use crate::error::{Result, StageReport};
use crate::extract::Extractor;
use crate::progress::{finish_progress, start_progress_bar};
use crate::store::Store;
use crate::vault::Vault;
use std::sync::Arc;
use tracing::{info, warn};

/// Pipeline options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Number of concurrent extraction workers
    pub workers: usize,
    /// Show a progress bar during extraction
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: crate::config::defaults::default_workers(),
            show_progress: false,
        }
    }
}

/// Index every document in `vault` into `store`
pub async fn run_pipeline(
    store: &Store,
    vault: &Vault,
    extractor: &Extractor,
    options: &PipelineOptions,
) -> Result<IndexStats> {
    let ids = vault.list_documents()?;
    let documents_found = ids.len();
    let stats = Arc::new(RunStats::new());
    let mut errors = Vec::new();

    info!(
        vault = %vault.root().display(),
        documents = documents_found,
        workers = options.workers,
        "Indexing vault"
    );

    // Stage 1: extraction
    let progress = if options.show_progress {
        start_progress_bar(documents_found, "Extracting documents")
    } else {
        None
    };
    let mut rx = ExtractWorkers::new(
        options.workers,
        store.clone(),
        vault.clone(),
        extractor.clone(),
        Arc::clone(&stats),
    )
    .with_progress(progress.clone())
    .start(ids);

    let mut extract = StageReport::new("extract");
    while let Some(err) = rx.recv().await {
        extract.push(err);
    }
    finish_progress(progress, "Documents extracted");
    abort_if_fatal(&mut extract)?;
    errors.extend(extract.messages());

    // Stage 2: graph degrees
    let graph = update_degrees(store, &stats).await;
    fail_stage(graph)?;

    // Stage 3: reconciliation
    let mut reconcile = remove_deleted(store, vault, &stats).await;
    abort_if_fatal(&mut reconcile)?;
    errors.extend(reconcile.messages());

    // Removed documents may have contributed edges
    if stats.removed() > 0 && store.counts().await?.documents > 0 {
        fail_stage(update_degrees(store, &stats).await)?;
    }

    let summary = stats.summary(documents_found, errors);
    info!(
        cached = summary.documents_cached,
        updated = summary.documents_updated,
        failed = summary.documents_failed,
        removed = summary.documents_removed,
        "Indexing complete"
    );
    Ok(summary)
}

fn abort_if_fatal(report: &mut StageReport) -> Result<()> {
    match report.take_fatal() {
        Some(err) => {
            for other in &report.errors {
                warn!("{}: {}", report.stage, other);
            }
            Err(err)
        }
        None => Ok(()),
    }
}

/// Any error in a stage that must fully succeed aborts the run
fn fail_stage(report: StageReport) -> Result<()> {
    let stage = report.stage;
    let mut errors = report.errors.into_iter();
    match errors.next() {
        Some(first) => {
            for other in errors {
                warn!("{}: {}", stage, other);
            }
            Err(first)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractConfig, IndexConfig};
    use crate::error::Error;
    use crate::extract::{HeadingFact, MetadataEntry, Wikilink};
    use crate::store::DocumentRecord;
    use std::path::Path;
    use tempfile::TempDir;

    const NOTE_A: &str = "---\ntitle: A\n---\nSee [[B]] and [[C|see C]] #topic\n";
    const NOTE_B: &str = "---\ntitle: B\n---\n# Bee\n\nOnly [[C]].\n";
    const NOTE_C: &str = "---\ntitle: C\n---\nA leaf #leaf\n";

    struct Fixture {
        _tmp: TempDir,
        root: std::path::PathBuf,
        store: Store,
        vault: Vault,
        extractor: Extractor,
    }

    async fn fixture(db_name: &str) -> Fixture {
        let files = [("A.md", NOTE_A), ("B.md", NOTE_B), ("C.md", NOTE_C)]
            .into_iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        fixture_with(db_name, files).await
    }

    async fn fixture_with(db_name: &str, files: Vec<(String, String)>) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("vault");
        std::fs::create_dir_all(&root).unwrap();
        for (name, content) in &files {
            std::fs::write(root.join(name), content).unwrap();
        }

        let store = Store::connect(&tmp.path().join(db_name)).await.unwrap();
        store.create_schema().await.unwrap();
        let vault = Vault::new(&root, &IndexConfig::default()).unwrap();

        Fixture {
            _tmp: tmp,
            root,
            store,
            vault,
            extractor: Extractor::new(ExtractConfig::default()),
        }
    }

    async fn run(f: &Fixture, workers: usize) -> Result<IndexStats> {
        let options = PipelineOptions {
            workers,
            show_progress: false,
        };
        run_pipeline(&f.store, &f.vault, &f.extractor, &options).await
    }

    async fn degrees(store: &Store, id: &str) -> (i64, i64) {
        let doc = store.get_document(id).await.unwrap().unwrap();
        (doc.in_degree, doc.out_degree)
    }

    /// Every stored fact about one document
    #[derive(Debug, PartialEq)]
    struct DocumentSnapshot {
        record: DocumentRecord,
        tags: Vec<String>,
        urls: Vec<String>,
        wikilinks: Vec<Wikilink>,
        headings: Vec<HeadingFact>,
        metadata: Vec<MetadataEntry>,
    }

    async fn snapshot(store: &Store) -> Vec<DocumentSnapshot> {
        let mut docs = Vec::new();
        for id in store.list_document_ids().await.unwrap() {
            docs.push(DocumentSnapshot {
                record: store.get_document(&id).await.unwrap().unwrap(),
                tags: store.list_tags(&id).await.unwrap(),
                urls: store.list_urls(&id).await.unwrap(),
                wikilinks: store.list_wikilinks(&id).await.unwrap(),
                headings: store.list_headings(&id).await.unwrap(),
                metadata: store.list_metadata(&id).await.unwrap(),
            });
        }
        docs
    }

    /// A vault of `count` interlinked notes with tags, headings and blocks
    fn generated_vault(count: usize) -> Vec<(String, String)> {
        const GROUPS: [&str; 5] = ["alpha", "beta", "gamma", "delta", "omega"];
        (0..count)
            .map(|i| {
                let content = format!(
                    "---\ntitle: Note {i}\nrank: {i}\n---\n# Note {i}\n\n\
                     Next is [[N{next:03}]], see also [[N{jump:03}|jump]] #group_{group}\n\n\
                     ## Details\n\n```!meta\nindex: {i}\nodd: {odd}\n```\n",
                    next = (i + 1) % count,
                    jump = (i * 7) % count,
                    group = GROUPS[i % GROUPS.len()],
                    odd = i % 2 == 1,
                );
                (format!("N{:03}.md", i), content)
            })
            .collect()
    }

    fn rewrite(root: &Path, name: &str, content: &str) {
        std::fs::write(root.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_full_run_builds_graph() {
        let f = fixture("db.sqlite").await;
        let stats = run(&f, 4).await.unwrap();

        assert_eq!(stats.documents_found, 3);
        assert_eq!(stats.documents_updated, 3);
        assert!(stats.errors.is_empty());

        assert_eq!(degrees(&f.store, "A.md").await, (0, 2));
        assert_eq!(degrees(&f.store, "B.md").await, (1, 1));
        assert_eq!(degrees(&f.store, "C.md").await, (2, 0));

        let tags = f.store.list_tags("A.md").await.unwrap();
        assert_eq!(tags, vec!["#topic"]);
        let headings = f.store.list_headings("B.md").await.unwrap();
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].text, "Bee");
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let f = fixture("db.sqlite").await;
        run(&f, 4).await.unwrap();
        let before = snapshot(&f.store).await;

        let stats = run(&f, 4).await.unwrap();
        assert_eq!(stats.documents_cached, 3);
        assert_eq!(stats.documents_updated, 0);

        assert_eq!(snapshot(&f.store).await, before);
        assert_eq!(degrees(&f.store, "C.md").await, (2, 0));
    }

    #[tokio::test]
    async fn test_changed_document_is_reextracted() {
        let f = fixture("db.sqlite").await;
        run(&f, 4).await.unwrap();

        rewrite(&f.root, "C.md", "---\ntitle: C\n---\nNow links [[A]] #changed\n");
        let stats = run(&f, 4).await.unwrap();

        assert_eq!(stats.documents_updated, 1);
        assert_eq!(stats.documents_cached, 2);
        assert_eq!(f.store.list_tags("C.md").await.unwrap(), vec!["#changed"]);
        assert_eq!(degrees(&f.store, "A.md").await, (1, 2));
        assert_eq!(degrees(&f.store, "C.md").await, (2, 1));
    }

    #[tokio::test]
    async fn test_deleted_document_is_reconciled() {
        let f = fixture("db.sqlite").await;
        run(&f, 4).await.unwrap();

        std::fs::remove_file(f.root.join("B.md")).unwrap();
        let stats = run(&f, 4).await.unwrap();

        assert_eq!(stats.documents_removed, 1);
        assert!(f.store.get_document("B.md").await.unwrap().is_none());
        assert!(f.store.list_wikilinks("B.md").await.unwrap().is_empty());
        assert!(f.store.list_metadata("B.md").await.unwrap().is_empty());
        assert_eq!(degrees(&f.store, "C.md").await, (1, 0));
    }

    #[tokio::test]
    async fn test_bad_block_is_reported_but_document_persists() {
        let f = fixture("db.sqlite").await;
        rewrite(
            &f.root,
            "D.md",
            "---\ntitle: D\n---\n[[A]]\n\n```!task\nkey: [unclosed\n```\n",
        );

        let stats = run(&f, 4).await.unwrap();
        assert_eq!(stats.documents_updated, 4);
        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].starts_with("extract: ERR_BLOCK_TO_JSON"));
        assert_eq!(degrees(&f.store, "A.md").await, (1, 2));
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_result() {
        let single = fixture_with("single.sqlite", generated_vault(100)).await;
        let many = fixture_with("many.sqlite", generated_vault(100)).await;

        let single_stats = run(&single, 1).await.unwrap();
        let many_stats = run(&many, 8).await.unwrap();
        assert_eq!(single_stats.documents_updated, 100);
        assert_eq!(many_stats.documents_updated, 100);
        assert!(many_stats.errors.is_empty());

        let expected = snapshot(&single.store).await;
        assert_eq!(expected.len(), 100);
        assert_eq!(snapshot(&many.store).await, expected);

        let first = &expected[0];
        assert_eq!(first.tags, vec!["#group_alpha"]);
        assert_eq!(first.headings.len(), 2);
        assert_eq!(first.metadata.len(), 2);
        // N000 is linked from N099 (next) and from N000 itself (jump 0)
        assert_eq!(first.record.in_degree, 2);
        assert_eq!(first.record.out_degree, 2);
    }

    #[tokio::test]
    async fn test_concurrent_rerun_is_idempotent() {
        let f = fixture_with("db.sqlite", generated_vault(60)).await;
        run(&f, 8).await.unwrap();
        let before = snapshot(&f.store).await;

        let stats = run(&f, 8).await.unwrap();
        assert_eq!(stats.documents_cached, 60);
        assert_eq!(snapshot(&f.store).await, before);
    }

    #[tokio::test]
    async fn test_empty_vault_fails_graph_stage() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("vault");
        std::fs::create_dir_all(&root).unwrap();
        let store = Store::connect(&tmp.path().join("db.sqlite")).await.unwrap();
        store.create_schema().await.unwrap();
        let vault = Vault::new(&root, &IndexConfig::default()).unwrap();

        let result = run_pipeline(
            &store,
            &vault,
            &Extractor::new(ExtractConfig::default()),
            &PipelineOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::EmptyStore)));
    }
}
