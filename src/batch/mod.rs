//! Day-level fan-out over stocks.
//!
//! Each stock runs in its own task behind a semaphore. A task that panics
//! becomes that stock's failure report; nothing one stock does reaches the
//! others. Stocks whose fatal stage failed on the model call get further
//! passes once the first pass is done.

pub mod summary;


use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

use crate::model::StockDisclosureRecord;
use crate::pipeline::PipelineOrchestrator;
use crate::report::{PartialFailureReport, PipelineOutcome};

pub use summary::{BatchSummary, MarketStats, PlayerActivity, StockLine, StockState};

#[derive(Clone)]
pub struct BatchCoordinator {
    orchestrator: Arc<PipelineOrchestrator>,
    concurrency: usize,
    retry_passes: usize,
}

impl BatchCoordinator {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, concurrency: usize, retry_passes: usize) -> Self {
        Self {
            orchestrator,
            concurrency: concurrency.max(1),
            retry_passes,
        }
    }

    pub async fn run_day(
        &self,
        records: Vec<StockDisclosureRecord>,
    ) -> BTreeMap<String, PipelineOutcome> {
        let (_tx, rx) = watch::channel(false);
        self.run_day_until(records, rx).await
    }

    /// Analyse every record. Stocks that have not started when `cancel` is
    /// set are reported as cancelled.
    pub async fn run_day_until(
        &self,
        records: Vec<StockDisclosureRecord>,
        cancel: watch::Receiver<bool>,
    ) -> BTreeMap<String, PipelineOutcome> {
        info!(
            "📊 [BATCH] Starting day run: {} stocks, concurrency {}",
            records.len(),
            self.concurrency
        );

        let mut outcomes = BTreeMap::new();
        let mut pending: Vec<Arc<StockDisclosureRecord>> = records.into_iter().map(Arc::new).collect();

        for pass in 0..=self.retry_passes {
            if pending.is_empty() {
                break;
            }
            if pass > 0 {
                info!(
                    "🔁 [BATCH] Retry pass {} for {} stocks with failed model calls",
                    pass,
                    pending.len()
                );
            }

            let mut retry = Vec::new();
            for (record, outcome) in self.run_pass(&pending, &cancel).await {
                if outcome.is_retryable() && pass < self.retry_passes && !*cancel.borrow() {
                    retry.push(record.clone());
                }
                outcomes.insert(record.ts_code.clone(), outcome);
            }
            pending = retry;
        }

        let complete = outcomes.values().filter(|o| o.is_complete()).count();
        info!(
            "📊 [BATCH] Day run finished: {}/{} stocks complete",
            complete,
            outcomes.len()
        );
        outcomes
    }

    async fn run_pass(
        &self,
        records: &[Arc<StockDisclosureRecord>],
        cancel: &watch::Receiver<bool>,
    ) -> Vec<(Arc<StockDisclosureRecord>, PipelineOutcome)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = records
            .iter()
            .map(|record| {
                let record = record.clone();
                let semaphore = semaphore.clone();
                let orchestrator = self.orchestrator.clone();
                let cancel = cancel.clone();
                let handle = tokio::spawn({
                    let record = record.clone();
                    async move {
                        let Ok(_permit) = semaphore.acquire_owned().await else {
                            return PipelineOutcome::Failed(PartialFailureReport::cancelled(&record, &[]));
                        };
                        if *cancel.borrow() {
                            return PipelineOutcome::Failed(PartialFailureReport::cancelled(&record, &[]));
                        }
                        orchestrator.run_until(&record, &cancel).await
                    }
                });
                (record, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (record, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("❌ [BATCH] Task for {} died: {}", record.ts_code, e);
                    PipelineOutcome::Failed(PartialFailureReport::crashed(
                        &record,
                        format!("stock task failed: {}", e),
                    ))
                }
            };
            if let PipelineOutcome::Failed(failure) = &outcome {
                warn!(
                    "⚠️ [BATCH] {} {} not complete: {}",
                    failure.stock_id, failure.stock_name, failure.reason
                );
            }
            results.push((record, outcome));
        }
        results
    }
}
