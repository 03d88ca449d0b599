//! Static stage definitions and per-stage results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::model::StockDisclosureRecord;
use crate::schema::{SchemaSpec, Violation};

/// Whether an input must be present for the stage to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// What a failed stage does to the rest of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Failure stops the stock's run
    Mandatory,
    /// Failure is recorded and downstream stages see the output as absent
    Optional,
}

/// Upstream stage output consumed by a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageInput {
    pub stage: String,
    pub requirement: Requirement,
}

/// Raw-record fields a stage may read. Each is exposed to the prompt
/// template under `var_name()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordField {
    StockIdentity,
    BasicInfo,
    ListingReasons,
    BuySeats,
    SellSeats,
    HistoricalBars,
}

impl RecordField {
    pub fn var_name(self) -> &'static str {
        match self {
            RecordField::StockIdentity => "stock",
            RecordField::BasicInfo => "basic_info",
            RecordField::ListingReasons => "listing_reasons",
            RecordField::BuySeats => "buy_seats",
            RecordField::SellSeats => "sell_seats",
            RecordField::HistoricalBars => "historical_bars",
        }
    }

    /// The field's value for `record`, `None` when the feed left it empty.
    pub fn extract(self, record: &StockDisclosureRecord) -> Option<Value> {
        match self {
            RecordField::StockIdentity => Some(json!({
                "ts_code": record.ts_code,
                "name": record.name,
                "trade_date": record.trade_date,
            })),
            RecordField::BasicInfo => record
                .basic_info
                .as_ref()
                .and_then(|info| serde_json::to_value(info).ok()),
            RecordField::ListingReasons => {
                let reasons = record.reasons();
                (!reasons.is_empty()).then(|| json!(reasons))
            }
            RecordField::BuySeats => record
                .seats()
                .and_then(|seats| serde_json::to_value(&seats.buy_seats).ok()),
            RecordField::SellSeats => record
                .seats()
                .and_then(|seats| serde_json::to_value(&seats.sell_seats).ok()),
            RecordField::HistoricalBars => record
                .history()
                .and_then(|bars| serde_json::to_value(bars).ok()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordInput {
    pub field: RecordField,
    pub requirement: Requirement,
}

/// One prompted unit of analysis.
#[derive(Clone, Debug)]
pub struct StageDefinition {
    pub name: String,
    pub inputs: Vec<StageInput>,
    pub record_inputs: Vec<RecordInput>,
    pub template: String,
    pub schema: Arc<SchemaSpec>,
    pub policy: FailurePolicy,
}

impl StageDefinition {
    /// A mandatory stage with no declared inputs.
    pub fn new(name: &str, template: &str, schema: SchemaSpec) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            record_inputs: Vec::new(),
            template: template.to_string(),
            schema: Arc::new(schema),
            policy: FailurePolicy::Mandatory,
        }
    }

    /// Declare a required upstream stage.
    pub fn requires(mut self, stage: &str) -> Self {
        self.inputs.push(StageInput {
            stage: stage.to_string(),
            requirement: Requirement::Required,
        });
        self
    }

    /// Declare an upstream stage whose output is used when available.
    pub fn uses(mut self, stage: &str) -> Self {
        self.inputs.push(StageInput {
            stage: stage.to_string(),
            requirement: Requirement::Optional,
        });
        self
    }

    pub fn reads(mut self, field: RecordField) -> Self {
        self.record_inputs.push(RecordInput {
            field,
            requirement: Requirement::Required,
        });
        self
    }

    pub fn reads_optional(mut self, field: RecordField) -> Self {
        self.record_inputs.push(RecordInput {
            field,
            requirement: Requirement::Optional,
        });
        self
    }

    pub fn optional(mut self) -> Self {
        self.policy = FailurePolicy::Optional;
        self
    }

    pub fn is_mandatory(&self) -> bool {
        self.policy == FailurePolicy::Mandatory
    }

    /// Every name the prompt template may reference.
    pub fn variables(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .map(|i| i.stage.as_str())
            .chain(self.record_inputs.iter().map(|r| r.field.var_name()))
            .collect()
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|i| i.stage.as_str())
    }
}

/// Terminal state of one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    SchemaInvalid,
    CallFailed,
    AbortedDependency,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Success => "success",
            StageStatus::SchemaInvalid => "schema_invalid",
            StageStatus::CallFailed => "call_failed",
            StageStatus::AbortedDependency => "aborted_dependency",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage: String,
    pub status: StageStatus,
    /// Validated output, present only on success
    pub output: Option<Value>,
    /// Last raw model reply, if any call returned
    pub raw: Option<String>,
    pub attempts: u32,
    pub violations: Vec<Violation>,
    pub error: Option<String>,
}

impl StageResult {
    pub fn success(stage: &str, output: Value, raw: String, attempts: u32) -> Self {
        Self {
            stage: stage.to_string(),
            status: StageStatus::Success,
            output: Some(output),
            raw: Some(raw),
            attempts,
            violations: Vec::new(),
            error: None,
        }
    }

    pub fn aborted(stage: &str, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.to_string(),
            status: StageStatus::AbortedDependency,
            output: None,
            raw: None,
            attempts: 0,
            violations: Vec::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }

    /// One-line description of why the stage did not succeed.
    pub fn failure_reason(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        if !self.violations.is_empty() {
            let details = self
                .violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return format!("schema violations after {} attempts: {}", self.attempts, details);
        }
        self.status.to_string()
    }
}
