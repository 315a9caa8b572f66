//! Concurrent import coordination.
//!
//! Fans [`import_layer`] out over a fixed-size pool. Work items are
//! independent and order-insensitive; one layer's failure never aborts
//! the others. The only shared state is the success counter, which is
//! incremented atomically and read once for the run summary — callers
//! needing per-item outcomes wrap `import_layer` directly.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::StreamExt;
use futures_util::stream;
use tracing::info;

use crate::dataset::DatasetRef;
use crate::import::{ImportStatus, import_layer};
use crate::ogr::{OgrRunner, ToolPaths};

/// Fixed worker pool size for the ingest run.
pub const IMPORT_CONCURRENCY: usize = 4;

/// Aggregate result of one ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub succeeded: usize,
    pub total: usize,
}

/// Import every discovered dataset with bounded concurrency.
pub async fn run_ingest<R: OgrRunner>(
    runner: &R,
    tools: &ToolPaths,
    pg_connection: &str,
    datasets: Vec<DatasetRef>,
) -> IngestSummary {
    let total = datasets.len();
    info!("{total} layers scheduled for copying from file GDB");

    let counter = AtomicUsize::new(0);
    stream::iter(datasets)
        .for_each_concurrent(IMPORT_CONCURRENCY, |dataset| {
            let counter = &counter;
            async move {
                let layer = dataset.layer.clone();
                let outcome = import_layer(runner, tools, pg_connection, dataset).await;
                if outcome.status == ImportStatus::Succeeded {
                    counter.fetch_add(1, Ordering::Relaxed);
                    info!("Layer {layer} completed");
                }
            }
        })
        .await;

    let succeeded = counter.load(Ordering::Relaxed);
    info!("{succeeded}/{total} layers successfully copied");
    IngestSummary { succeeded, total }
}

// ── Tests ───────────────────────────────────────────────────────────
