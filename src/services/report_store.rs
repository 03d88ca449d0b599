use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::batch::{BatchSummary, StockLine};
use crate::constants::files;
use crate::error::StoreError;
use crate::model::StockDisclosureRecord;
use crate::report::{AnalysisReport, PipelineOutcome};

/// One line of `runs.jsonl`, appended per stock outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub ts: String,
    pub run_id: String,
    pub trade_date: String,
    #[serde(flatten)]
    pub line: StockLine,
}

/// File layout under `output_dir`:
///
/// ```text
/// <trade_date>/<name>_<code>_analysis.json
/// <trade_date>/<name>_<code>_failure.json
/// <trade_date>/summary.json
/// runs.jsonl
/// ```
#[derive(Clone, Debug)]
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn day_dir(&self, trade_date: &str) -> PathBuf {
        self.root.join(trade_date)
    }

    pub fn analysis_path(&self, record: &StockDisclosureRecord) -> PathBuf {
        self.day_dir(&record.trade_date)
            .join(format!("{}{}", record.file_stem(), files::ANALYSIS_SUFFIX))
    }

    pub fn failure_path(&self, record: &StockDisclosureRecord) -> PathBuf {
        self.day_dir(&record.trade_date)
            .join(format!("{}{}", record.file_stem(), files::FAILURE_SUFFIX))
    }

    pub fn summary_path(&self, trade_date: &str) -> PathBuf {
        self.day_dir(trade_date).join(files::SUMMARY_FILE)
    }

    /// Write the outcome file for `record`. A success removes a stale
    /// failure file from an earlier run.
    pub fn write_outcome(
        &self,
        record: &StockDisclosureRecord,
        outcome: &PipelineOutcome,
    ) -> Result<PathBuf, StoreError> {
        let path = match outcome {
            PipelineOutcome::Complete(report) => {
                let path = self.analysis_path(record);
                write_json(&path, report)?;
                let stale = self.failure_path(record);
                if stale.exists() {
                    std::fs::remove_file(&stale).map_err(|e| StoreError::io(&stale, e))?;
                }
                path
            }
            PipelineOutcome::Failed(failure) => {
                let path = self.failure_path(record);
                write_json(&path, failure)?;
                path
            }
        };
        debug!("💾 [STORE] Wrote {}", path.display());
        Ok(path)
    }

    /// A previously written analysis for `record`, if one parses.
    pub fn load_existing(&self, record: &StockDisclosureRecord) -> Option<AnalysisReport> {
        let path = self.analysis_path(record);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("⚠️ [STORE] Ignoring unreadable {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn write_summary(&self, summary: &BatchSummary) -> Result<PathBuf, StoreError> {
        let path = self.summary_path(&summary.trade_date);
        write_json(&path, summary)?;
        info!("💾 [STORE] Summary saved: {}", path.display());
        Ok(path)
    }

    pub fn read_summary(&self, trade_date: &str) -> Result<BatchSummary, StoreError> {
        let path = self.summary_path(trade_date);
        let content = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn append_run_log(
        &self,
        run_id: &str,
        trade_date: &str,
        line: &StockLine,
    ) -> Result<(), StoreError> {
        let path = self.root.join("runs.jsonl");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let entry = RunLogEntry {
            ts: Utc::now().to_rfc3339(),
            run_id: run_id.to_string(),
            trade_date: trade_date.to_string(),
            line: line.clone(),
        };

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let text = serde_json::to_string(&entry)?;
        writeln!(f, "{}", text).map_err(|e| StoreError::io(&path, e))?;
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?).map_err(|e| StoreError::io(path, e))
}
