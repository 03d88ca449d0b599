use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::context::ContextAccumulator;
use super::executor::StageExecutor;
use super::graph::StageGraph;
use super::stage::StageResult;
use crate::constants::events;
use crate::llm::Priority;
use crate::model::StockDisclosureRecord;
use crate::report::{AnalysisReport, PartialFailureReport, PipelineOutcome, SkippedStage};

/// Drives one stock through the stage graph, layer by layer.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    graph: Arc<StageGraph>,
    executor: StageExecutor,
    stage_fanout: usize,
}

impl PipelineOrchestrator {
    pub fn new(graph: Arc<StageGraph>, executor: StageExecutor, stage_fanout: usize) -> Self {
        Self {
            graph,
            executor,
            stage_fanout: stage_fanout.max(1),
        }
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub async fn run(&self, record: &StockDisclosureRecord) -> PipelineOutcome {
        let (_tx, rx) = watch::channel(false);
        self.run_until(record, &rx).await
    }

    /// Run `record`, checking `cancel` before each layer starts.
    pub async fn run_until(
        &self,
        record: &StockDisclosureRecord,
        cancel: &watch::Receiver<bool>,
    ) -> PipelineOutcome {
        info!("🐉 [PIPELINE] Analysing {} {}", record.ts_code, record.name);

        let stages = self.graph.stages();
        let mut context = ContextAccumulator::new();
        let mut skipped = Vec::new();

        for layer in self.graph.layers() {
            if *cancel.borrow() {
                warn!(
                    "🛑 [PIPELINE] {} cancelled after {} stages",
                    record.ts_code,
                    context.len()
                );
                return PipelineOutcome::Failed(PartialFailureReport::cancelled(
                    record,
                    context.completed(),
                ));
            }

            // Collected first so the spawned stock task stays Send.
            let calls: Vec<_> = layer
                .iter()
                .map(|&i| {
                    let stage = &stages[i];
                    let priority = if stage.inputs.is_empty() {
                        Priority::Normal
                    } else {
                        Priority::High
                    };
                    self.executor.execute(stage, record, &context, priority)
                })
                .collect();
            let results: Vec<StageResult> = stream::iter(calls)
                .buffered(self.stage_fanout)
                .collect()
                .await;

            let mut fatal: Option<StageResult> = None;
            for (result, &i) in results.into_iter().zip(layer.iter()) {
                let stage = &stages[i];
                if let Some(output) = result.output.clone().filter(|_| result.is_success()) {
                    if let Err(e) = context.put(&result.stage, output) {
                        error!("❌ [PIPELINE] {}: {}", record.ts_code, e);
                    }
                    continue;
                }

                context.mark_failed(&result.stage);
                if stage.is_mandatory() {
                    if fatal.is_none() {
                        fatal = Some(result);
                    }
                } else {
                    warn!(
                        event = events::STAGE_SKIPPED,
                        "⏭️ [PIPELINE] Optional stage {} skipped for {}: {}",
                        result.stage,
                        record.ts_code,
                        result.failure_reason()
                    );
                    skipped.push(SkippedStage::from_result(&result));
                }
            }

            if let Some(result) = fatal {
                error!(
                    event = events::PIPELINE_FAILED,
                    "❌ [PIPELINE] {} stopped at mandatory stage {} ({})",
                    record.ts_code,
                    result.stage,
                    result.status
                );
                return PipelineOutcome::Failed(PartialFailureReport::from_stage(
                    record,
                    context.completed(),
                    &result,
                ));
            }
        }

        info!(
            event = events::PIPELINE_COMPLETED,
            "🏁 [PIPELINE] {} complete ({} stages, {} skipped)",
            record.ts_code,
            context.len(),
            skipped.len()
        );
        PipelineOutcome::Complete(AnalysisReport::new(record, context.into_outputs(), skipped))
    }
}
