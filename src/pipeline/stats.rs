//! Run statistics shared across pipeline stages

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What happened to one document during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hash matched, nothing written
    Cached,
    /// Extracted and written
    Updated,
    /// Read, extraction or write failed
    Failed,
    /// Removed because its file no longer exists
    Removed,
}

/// Counters for one run, safe to share between workers
#[derive(Debug, Default)]
pub struct RunStats {
    cached: AtomicUsize,
    updated: AtomicUsize,
    failed: AtomicUsize,
    removed: AtomicUsize,
    in_degree_rows: AtomicUsize,
    out_degree_rows: AtomicUsize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Cached => &self.cached,
            Outcome::Updated => &self.updated,
            Outcome::Failed => &self.failed,
            Outcome::Removed => &self.removed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degrees(&self, in_rows: usize, out_rows: usize) {
        self.in_degree_rows.store(in_rows, Ordering::Relaxed);
        self.out_degree_rows.store(out_rows, Ordering::Relaxed);
    }

    pub fn cached(&self) -> usize {
        self.cached.load(Ordering::Relaxed)
    }

    pub fn updated(&self) -> usize {
        self.updated.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::Relaxed)
    }

    /// Freeze the counters into a summary
    pub fn summary(&self, documents_found: usize, errors: Vec<String>) -> IndexStats {
        IndexStats {
            documents_found,
            documents_cached: self.cached(),
            documents_updated: self.updated(),
            documents_failed: self.failed(),
            documents_removed: self.removed(),
            in_degree_rows: self.in_degree_rows.load(Ordering::Relaxed),
            out_degree_rows: self.out_degree_rows.load(Ordering::Relaxed),
            errors,
        }
    }
}

/// Statistics from an indexing run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents_found: usize,
    pub documents_cached: usize,
    pub documents_updated: usize,
    pub documents_failed: usize,
    pub documents_removed: usize,
    pub in_degree_rows: usize,
    pub out_degree_rows: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_from_many_threads() {
        let stats = Arc::new(RunStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record(Outcome::Cached);
                    }
                    stats.record(Outcome::Updated);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = stats.summary(808, Vec::new());
        assert_eq!(summary.documents_cached, 800);
        assert_eq!(summary.documents_updated, 8);
        assert_eq!(summary.documents_failed, 0);
    }
}
