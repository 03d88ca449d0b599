//! Dragon-Tiger Analyst - multi-stage LLM analysis of daily dragon-tiger lists
//!
//! This library provides the schema-checked stage pipeline, the canonical
//! seven-stage analysis, and the day-level batch runner that writes per-stock
//! reports and the day summary.

pub mod api;
pub mod batch;
pub mod config;
pub mod constants;
pub mod error;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod services;
pub mod stages;

// Re-export commonly used types
pub use batch::{BatchCoordinator, BatchSummary};
pub use config::AppConfig;
pub use model::StockDisclosureRecord;
pub use pipeline::{PipelineOrchestrator, StageGraph};
pub use report::{AnalysisReport, PartialFailureReport, PipelineOutcome};

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod model_tests;
