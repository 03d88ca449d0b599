use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::context::ContextAccumulator;
use super::stage::{Requirement, StageDefinition, StageResult, StageStatus};
use super::template::PromptRenderer;
use crate::constants::events;
use crate::llm::json::{extract_json, unwrap_envelope};
use crate::llm::{LlmCall, LlmRequest, Priority};
use crate::model::StockDisclosureRecord;
use crate::schema::{validate, ValidationResult, Violation};

/// Runs one stage: gather inputs, render, call, validate, retry.
#[derive(Clone)]
pub struct StageExecutor {
    llm: Arc<dyn LlmCall>,
    renderer: Arc<PromptRenderer>,
    max_attempts: u32,
}

impl StageExecutor {
    pub fn new(llm: Arc<dyn LlmCall>, renderer: Arc<PromptRenderer>, max_attempts: u32) -> Self {
        Self {
            llm,
            renderer,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn execute(
        &self,
        stage: &StageDefinition,
        record: &StockDisclosureRecord,
        context: &ContextAccumulator,
        priority: Priority,
    ) -> StageResult {
        let vars = match Self::collect_variables(stage, record, context) {
            Ok(vars) => vars,
            Err(reason) => {
                warn!(
                    event = events::STAGE_ABORTED,
                    "⛔ [STAGE] {} aborted for {}: {}", stage.name, record.ts_code, reason
                );
                return StageResult::aborted(&stage.name, reason);
            }
        };

        let prompt = match self.renderer.render(&stage.name, &stage.template, &vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!("❌ [STAGE] {}", e);
                return StageResult::aborted(&stage.name, e.to_string());
            }
        };

        info!(
            event = events::STAGE_STARTED,
            "🧩 [STAGE] {} started for {} ({} priority)",
            stage.name,
            record.ts_code,
            priority.as_str()
        );

        let mut last_raw = None;
        let mut last_violations = Vec::new();

        for attempt in 1..=self.max_attempts {
            let request = LlmRequest {
                stage: stage.name.clone(),
                prompt: prompt.clone(),
                schema: stage.schema.clone(),
                priority,
            };

            let raw = match self.llm.call(request).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!(
                        event = events::STAGE_CALL_FAILED,
                        "❌ [STAGE] {} call failed for {}: {}", stage.name, record.ts_code, e
                    );
                    return StageResult {
                        stage: stage.name.clone(),
                        status: StageStatus::CallFailed,
                        output: None,
                        raw: last_raw,
                        attempts: attempt,
                        violations: last_violations,
                        error: Some(e.to_string()),
                    };
                }
            };

            let outcome = match extract_json(&raw) {
                Some(value) => validate(&unwrap_envelope(value, &stage.name), &stage.schema),
                None => ValidationResult::Invalid(vec![Violation::unparseable()]),
            };

            match outcome {
                ValidationResult::Valid(output) => {
                    info!(
                        event = events::STAGE_SUCCEEDED,
                        "✅ [STAGE] {} succeeded for {} (attempt {})",
                        stage.name,
                        record.ts_code,
                        attempt
                    );
                    return StageResult::success(&stage.name, output, raw, attempt);
                }
                ValidationResult::Invalid(violations) => {
                    let summary = violations
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join("; ");
                    if attempt < self.max_attempts {
                        warn!(
                            event = events::STAGE_RETRY,
                            "🔁 [STAGE] {} schema-invalid for {} (attempt {}/{}): {}",
                            stage.name,
                            record.ts_code,
                            attempt,
                            self.max_attempts,
                            summary
                        );
                    }
                    debug!("🧩 [STAGE] {} raw reply: {}", stage.name, raw);
                    last_raw = Some(raw);
                    last_violations = violations;
                }
            }
        }

        warn!(
            event = events::STAGE_SCHEMA_INVALID,
            "⚠️ [STAGE] {} schema-invalid for {} after {} attempts",
            stage.name,
            record.ts_code,
            self.max_attempts
        );
        StageResult {
            stage: stage.name.clone(),
            status: StageStatus::SchemaInvalid,
            output: None,
            raw: last_raw,
            attempts: self.max_attempts,
            violations: last_violations,
            error: None,
        }
    }

    /// Template variables for `stage`. Required inputs that are missing
    /// yield the abort reason; optional ones are bound to null.
    fn collect_variables(
        stage: &StageDefinition,
        record: &StockDisclosureRecord,
        context: &ContextAccumulator,
    ) -> Result<BTreeMap<String, Value>, String> {
        let mut vars = BTreeMap::new();

        for input in &stage.inputs {
            let value = match (context.get(&input.stage), input.requirement) {
                (Some(output), _) => Value::String(pretty(output)),
                (None, Requirement::Optional) => Value::Null,
                (None, Requirement::Required) if context.is_failed(&input.stage) => {
                    return Err(format!("required stage {} failed", input.stage));
                }
                (None, Requirement::Required) => {
                    return Err(format!("required stage {} has no output", input.stage));
                }
            };
            vars.insert(input.stage.clone(), value);
        }

        for input in &stage.record_inputs {
            let name = input.field.var_name();
            let value = match (input.field.extract(record), input.requirement) {
                (Some(value), _) => Value::String(pretty(&value)),
                (None, Requirement::Optional) => Value::Null,
                (None, Requirement::Required) => {
                    return Err(format!("required record field {} is absent", name));
                }
            };
            vars.insert(name.to_string(), value);
        }

        Ok(vars)
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
