//! Custom error types for the analysis pipeline
//!
//! Schema-invalid and call-failed stage outcomes are not errors here: they are
//! ordinary `StageStatus` values. These enums cover faults in the machinery
//! around the model calls.

use thiserror::Error;

/// Failures of the LLM call collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("LLM queue is closed")]
    QueueClosed,

    #[error("LLM request was cancelled")]
    Cancelled,
}

impl From<async_openai::error::OpenAIError> for LlmError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        LlmError::Transport(err.to_string())
    }
}

/// Context accumulator misuse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Stage output already recorded: {stage}")]
    DuplicateStage { stage: String },

    #[error("Stage output not available: {stage}")]
    MissingStage { stage: String },
}

/// Stage graph construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Stage defined twice: {stage}")]
    DuplicateStage { stage: String },

    #[error("Stage {stage} depends on unknown stage {dependency}")]
    UnknownDependency { stage: String, dependency: String },

    #[error("Dependency cycle among stages: {stages:?}")]
    Cycle { stages: Vec<String> },

    #[error("Template for stage {stage} does not compile: {reason}")]
    TemplateSyntax { stage: String, reason: String },

    #[error("Template for stage {stage} uses undeclared variable {variable}")]
    UndeclaredVariable { stage: String, variable: String },

    #[error("Stage graph is empty")]
    Empty,
}

/// Prompt rendering failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to render prompt for {stage}: {reason}")]
pub struct TemplateError {
    pub stage: String,
    pub reason: String,
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Input loading and report persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
