use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::error;

use crate::error::ContextError;

/// Validated stage outputs of one stock's run, keyed by stage name.
///
/// Entries are never overwritten. Failed stages are tracked separately so
/// downstream prompts and the final report can tell "failed" from "not run".
#[derive(Clone, Debug, Default)]
pub struct ContextAccumulator {
    outputs: BTreeMap<String, Value>,
    order: Vec<String>,
    failed: BTreeSet<String>,
}

impl ContextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, stage: &str, output: Value) -> Result<(), ContextError> {
        if self.outputs.contains_key(stage) || self.failed.contains(stage) {
            error!("❌ [CONTEXT] Refusing to overwrite stage output: {}", stage);
            return Err(ContextError::DuplicateStage {
                stage: stage.to_string(),
            });
        }
        self.outputs.insert(stage.to_string(), output);
        self.order.push(stage.to_string());
        Ok(())
    }

    pub fn get(&self, stage: &str) -> Option<&Value> {
        self.outputs.get(stage)
    }

    /// All of `stages`, or the first one that is missing.
    pub fn get_many(&self, stages: &[&str]) -> Result<BTreeMap<String, Value>, ContextError> {
        stages
            .iter()
            .map(|&stage| {
                self.outputs
                    .get(stage)
                    .map(|v| (stage.to_string(), v.clone()))
                    .ok_or_else(|| ContextError::MissingStage {
                        stage: stage.to_string(),
                    })
            })
            .collect()
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.outputs.contains_key(stage)
    }

    pub fn mark_failed(&mut self, stage: &str) {
        self.failed.insert(stage.to_string());
    }

    pub fn is_failed(&self, stage: &str) -> bool {
        self.failed.contains(stage)
    }

    /// Successful stages in the order they were recorded.
    pub fn completed(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn into_outputs(self) -> BTreeMap<String, Value> {
        self.outputs
    }
}
