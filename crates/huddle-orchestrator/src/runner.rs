//! Batch runner - many independent drafts on a bounded worker pool
//!
//! Every run gets its own board, recorder and backend instance, and seed
//! `base_seed + index`. At most `concurrency` runs are in flight; results
//! come back over a channel and are returned in index order.

use huddle_agent::DecisionBackend;
use huddle_core::{DraftConfig, DraftError, PlayerPool, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::{run_draft, DraftResult};
use crate::recorder::RunRecorder;

/// How many runs, and how many at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub count: usize,
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 1,
            concurrency: 4,
        }
    }
}

/// Result of one run in a batch
#[derive(Debug)]
pub struct RunOutcome {
    pub index: usize,
    pub seed: u64,
    pub result: Result<DraftResult>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `batch.count` drafts, `batch.concurrency` at a time
///
/// The factories are called once per run index, before the run starts.
/// Cancelling `cancel` stops every run at its next turn boundary.
pub async fn run_many<B, R>(
    config: &DraftConfig,
    pool: &PlayerPool,
    batch: BatchConfig,
    backend_factory: B,
    recorder_factory: R,
    cancel: CancellationToken,
) -> Vec<RunOutcome>
where
    B: Fn(usize) -> Arc<dyn DecisionBackend>,
    R: Fn(usize) -> Arc<dyn RunRecorder>,
{
    let concurrency = batch.concurrency.max(1);
    info!(
        "Running {} drafts, {} at a time",
        batch.count, concurrency
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel(batch.count.max(1));
    let mut tasks = JoinSet::new();

    for index in 0..batch.count {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Worker pool closed, stopping at run {}: {}", index, e);
                break;
            }
        };

        let mut run_config = config.clone();
        let seed = config.league.seed.wrapping_add(index as u64);
        run_config.league.seed = seed;
        let pool = pool.clone();
        let backend = backend_factory(index);
        let recorder = recorder_factory(index);
        let cancel = cancel.child_token();
        let tx = tx.clone();

        tasks.spawn(async move {
            let _permit = permit;
            let result = run_draft(&run_config, pool, backend, recorder, cancel).await;
            if let Err(e) = &result {
                warn!("Run {} (seed {}) failed: {}", index, seed, e);
            }
            // Receiver outlives every task
            let _ = tx.send(RunOutcome { index, seed, result }).await;
        });
    }
    drop(tx);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Draft task did not finish: {}", e);
        }
    }

    let mut outcomes = Vec::with_capacity(batch.count);
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }

    // Runs whose task died never reported back
    let reported: HashSet<usize> = outcomes.iter().map(|o| o.index).collect();
    for index in (0..batch.count).filter(|i| !reported.contains(i)) {
        outcomes.push(RunOutcome {
            index,
            seed: config.league.seed.wrapping_add(index as u64),
            result: Err(DraftError::Other(format!("run {} did not report", index))),
        });
    }

    outcomes.sort_by_key(|o| o.index);
    let complete = outcomes.iter().filter(|o| o.is_complete()).count();
    info!("{} of {} drafts complete", complete, outcomes.len());
    outcomes
}
