//! Link-graph degree aggregation

use super::stats::RunStats;
use crate::error::{Error, Result, StageReport};
use crate::store::{DegreeRow, Store};
use futures::{Stream, TryStreamExt};
use tracing::{debug, info};

/// Which degree column a pass writes
#[derive(Debug, Clone, Copy)]
enum Direction {
    In,
    Out,
}

/// Recompute in-degree and out-degree for every document.
///
/// Both passes run concurrently and must both finish. A pass that sees
/// no documents at all reports `Error::EmptyStore`.
pub async fn update_degrees(store: &Store, stats: &RunStats) -> StageReport {
    let mut report = StageReport::new("graph");

    let (in_rows, out_rows) = tokio::join!(
        apply_degrees(store, Direction::In, store.compute_in_degree()),
        apply_degrees(store, Direction::Out, store.compute_out_degree()),
    );

    let in_rows = in_rows.unwrap_or_else(|e| {
        report.push(e);
        0
    });
    let out_rows = out_rows.unwrap_or_else(|e| {
        report.push(e);
        0
    });

    stats.record_degrees(in_rows, out_rows);
    info!(in_rows, out_rows, "Updated link degrees");
    report
}

async fn apply_degrees<S>(store: &Store, direction: Direction, rows: S) -> Result<usize>
where
    S: Stream<Item = Result<DegreeRow>>,
{
    let mut rows = Box::pin(rows);
    let mut applied = 0;

    while let Some(row) = rows.try_next().await? {
        match direction {
            Direction::In => store.set_in_degree(&row).await?,
            Direction::Out => store.set_out_degree(&row).await?,
        }
        applied += 1;
    }

    debug!(?direction, applied, "Degree pass finished");
    if applied == 0 {
        return Err(Error::EmptyStore);
    }
    Ok(applied)
}
