use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

use super::report_store::ReportStore;
use crate::batch::{BatchCoordinator, BatchSummary, StockLine};
use crate::error::StoreError;
use crate::model::{load_day, StockDisclosureRecord};
use crate::report::PipelineOutcome;

/// Result of one processed day file.
#[derive(Debug)]
pub struct DayRun {
    pub run_id: String,
    pub trade_date: String,
    pub outcomes: BTreeMap<String, PipelineOutcome>,
    pub summary: BatchSummary,
}

/// Loads a day file, runs the batch and persists every outcome.
#[derive(Clone)]
pub struct DayRunner {
    coordinator: Arc<BatchCoordinator>,
    store: ReportStore,
}

impl DayRunner {
    pub fn new(coordinator: Arc<BatchCoordinator>, store: ReportStore) -> Self {
        Self { coordinator, store }
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn new_run_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn run_file(
        &self,
        run_id: String,
        path: &Path,
        skip_existing: bool,
        cancel: watch::Receiver<bool>,
    ) -> Result<DayRun, StoreError> {
        info!("📂 [RUNNER] Loading day file {}", path.display());
        let records = load_day(path)?;
        self.run_records(run_id, records, skip_existing, cancel).await
    }

    pub async fn run_records(
        &self,
        run_id: String,
        records: Vec<StockDisclosureRecord>,
        skip_existing: bool,
        cancel: watch::Receiver<bool>,
    ) -> Result<DayRun, StoreError> {
        let trade_date = records
            .first()
            .map(|r| r.trade_date.clone())
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            "📂 [RUNNER] Run {} for {}: {} stocks",
            run_id,
            trade_date,
            records.len()
        );

        let mut outcomes = BTreeMap::new();
        let mut to_run = Vec::new();
        for record in records {
            if skip_existing {
                if let Some(report) = self.store.load_existing(&record) {
                    info!("⏭️ [RUNNER] {} already analysed, skipping", record.ts_code);
                    outcomes.insert(record.ts_code.clone(), PipelineOutcome::Complete(report));
                    continue;
                }
            }
            to_run.push(record);
        }

        let by_id: HashMap<String, StockDisclosureRecord> = to_run
            .iter()
            .map(|r| (r.ts_code.clone(), r.clone()))
            .collect();

        for (id, outcome) in self.coordinator.run_day_until(to_run, cancel).await {
            if let Some(record) = by_id.get(&id) {
                if let Err(e) = self.store.write_outcome(record, &outcome) {
                    error!("❌ [RUNNER] Failed to save outcome for {}: {}", id, e);
                }
                if let Err(e) = self.store.append_run_log(&run_id, &trade_date, &StockLine::of(&outcome)) {
                    error!("❌ [RUNNER] Failed to append run log for {}: {}", id, e);
                }
            }
            outcomes.insert(id, outcome);
        }

        let summary = BatchSummary::from_outcomes(trade_date.clone(), outcomes.values());
        summary.log();
        self.store.write_summary(&summary)?;

        Ok(DayRun {
            run_id,
            trade_date,
            outcomes,
            summary,
        })
    }
}
