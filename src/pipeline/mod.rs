//! The per-stock analysis pipeline.
//!
//! A [`StageGraph`] of [`StageDefinition`]s is validated once at startup. The
//! [`PipelineOrchestrator`] walks it layer by layer for each record, handing
//! each stage to the [`StageExecutor`] together with the outputs gathered so
//! far in a [`ContextAccumulator`].

pub mod context;
pub mod executor;
pub mod graph;
pub mod orchestrator;
pub mod stage;
pub mod template;

#[cfg(test)]
mod orchestrator_tests;

pub use context::ContextAccumulator;
pub use executor::StageExecutor;
pub use graph::StageGraph;
pub use orchestrator::PipelineOrchestrator;
pub use stage::{
    FailurePolicy, RecordField, RecordInput, Requirement, StageDefinition, StageInput,
    StageResult, StageStatus,
};
pub use template::PromptRenderer;
