//! Per-stock outcomes of a pipeline run.
//!
//! A run ends either in an [`AnalysisReport`] (every mandatory stage
//! succeeded) or a [`PartialFailureReport`]. Both serialize to the JSON files
//! the report store writes. The typed views at the bottom read validated
//! stage outputs back for the day statistics.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::constants::{pipeline::CANCELLED_REASON, stages};
use crate::model::{PlayerType, StockDisclosureRecord};
use crate::pipeline::{StageResult, StageStatus};
use crate::schema::{SentimentLevel, Verdict};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInfo {
    pub ts_code: String,
    pub name: String,
    pub trade_date: String,
}

impl StockInfo {
    pub fn of(record: &StockDisclosureRecord) -> Self {
        Self {
            ts_code: record.ts_code.clone(),
            name: record.name.clone(),
            trade_date: record.trade_date.clone(),
        }
    }
}

/// An optional stage that did not make it into the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStage {
    pub stage: String,
    pub status: StageStatus,
    pub reason: String,
}

impl SkippedStage {
    pub fn from_result(result: &StageResult) -> Self {
        Self {
            stage: result.stage.clone(),
            status: result.status,
            reason: result.failure_reason(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub stock_info: StockInfo,
    /// Stage name to validated stage output
    pub analysis_report: BTreeMap<String, Value>,
    #[serde(default)]
    pub skipped_stages: Vec<SkippedStage>,
    pub generated_at: String,
}

impl AnalysisReport {
    pub fn new(
        record: &StockDisclosureRecord,
        outputs: BTreeMap<String, Value>,
        skipped_stages: Vec<SkippedStage>,
    ) -> Self {
        Self {
            stock_info: StockInfo::of(record),
            analysis_report: outputs,
            skipped_stages,
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    /// Some optional stage is missing.
    pub fn is_degraded(&self) -> bool {
        !self.skipped_stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.analysis_report.keys().map(String::as_str).collect()
    }

    fn view<T: for<'de> Deserialize<'de>>(&self, stage: &str) -> Option<T> {
        self.analysis_report
            .get(stage)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn overall(&self) -> Option<OverallView> {
        self.view(stages::OVERALL_ASSESSMENT)
    }

    pub fn key_forces(&self) -> Option<KeyForcesView> {
        self.view(stages::KEY_FORCES)
    }

    pub fn historical(&self) -> Option<HistoricalView> {
        self.view(stages::HISTORICAL_CONTEXT)
    }

    pub fn listing(&self) -> Option<ListingView> {
        self.view(stages::LISTING_REASON)
    }
}

/// Why a stock's run stopped before a full report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialFailureReport {
    pub stock_id: String,
    pub stock_name: String,
    pub trade_date: String,
    pub completed_stages: Vec<String>,
    pub first_fatal_stage: Option<String>,
    pub reason: String,
    pub status: Option<StageStatus>,
    /// A later pass may succeed: the fatal stage failed on the model call
    pub retryable: bool,
    pub generated_at: String,
}

impl PartialFailureReport {
    fn base(record: &StockDisclosureRecord, completed: &[String], reason: String) -> Self {
        Self {
            stock_id: record.ts_code.clone(),
            stock_name: record.name.clone(),
            trade_date: record.trade_date.clone(),
            completed_stages: completed.to_vec(),
            first_fatal_stage: None,
            reason,
            status: None,
            retryable: false,
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn from_stage(
        record: &StockDisclosureRecord,
        completed: &[String],
        fatal: &StageResult,
    ) -> Self {
        Self {
            first_fatal_stage: Some(fatal.stage.clone()),
            status: Some(fatal.status),
            retryable: fatal.status == StageStatus::CallFailed,
            ..Self::base(record, completed, fatal.failure_reason())
        }
    }

    pub fn cancelled(record: &StockDisclosureRecord, completed: &[String]) -> Self {
        Self::base(record, completed, CANCELLED_REASON.to_string())
    }

    /// The stock's task died before producing an outcome.
    pub fn crashed(record: &StockDisclosureRecord, reason: impl Into<String>) -> Self {
        Self::base(record, &[], reason.into())
    }

    pub fn is_cancelled(&self) -> bool {
        self.first_fatal_stage.is_none() && self.reason == CANCELLED_REASON
    }
}

#[derive(Clone, Debug)]
pub enum PipelineOutcome {
    Complete(AnalysisReport),
    Failed(PartialFailureReport),
}

impl PipelineOutcome {
    pub fn stock_id(&self) -> &str {
        match self {
            PipelineOutcome::Complete(r) => &r.stock_info.ts_code,
            PipelineOutcome::Failed(f) => &f.stock_id,
        }
    }

    pub fn stock_name(&self) -> &str {
        match self {
            PipelineOutcome::Complete(r) => &r.stock_info.name,
            PipelineOutcome::Failed(f) => &f.stock_name,
        }
    }

    pub fn trade_date(&self) -> &str {
        match self {
            PipelineOutcome::Complete(r) => &r.stock_info.trade_date,
            PipelineOutcome::Failed(f) => &f.trade_date,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PipelineOutcome::Complete(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineOutcome::Failed(f) if f.retryable)
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            PipelineOutcome::Complete(r) => Some(r),
            PipelineOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PartialFailureReport> {
        match self {
            PipelineOutcome::Complete(_) => None,
            PipelineOutcome::Failed(f) => Some(f),
        }
    }
}

// ============= Typed views =============

#[derive(Clone, Debug, Deserialize)]
pub struct LevelView {
    pub level: SentimentLevel,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OverallView {
    pub verdict: Verdict,
    pub confidence_score: f64,
    pub market_sentiment: LevelView,
    pub capital_confrontation: LevelView,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ForceView {
    #[serde(default)]
    pub player_type: PlayerType,
}

#[derive(Clone, Debug, Deserialize)]
pub struct KeyForcesView {
    #[serde(default)]
    pub buying_force: Vec<ForceView>,
    #[serde(default)]
    pub selling_force: Vec<ForceView>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HistoricalView {
    pub behavior_type: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ListingView {
    #[serde(default)]
    pub reasons: Vec<String>,
}
