//! Unit tests for the pipeline orchestrator over the canonical graph.

#[cfg(test)]
mod orchestrator_tests {
    use crate::constants::stages;
    use crate::error::LlmError;
    use crate::llm::{LlmCall, Priority};
    use crate::pipeline::{PipelineOrchestrator, PromptRenderer, StageExecutor, StageStatus};
    use crate::report::PipelineOutcome;
    use crate::stages::{canonical_graph, canonical_stages};
    use crate::testing::{canned_output, sample_record, CallEvent, ScriptedLlm};
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::watch;

    fn orchestrator(llm: Arc<ScriptedLlm>, fanout: usize) -> PipelineOrchestrator {
        let renderer = Arc::new(PromptRenderer::new());
        let graph = Arc::new(canonical_graph(&renderer).unwrap());
        let llm: Arc<dyn LlmCall> = llm;
        PipelineOrchestrator::new(graph, StageExecutor::new(llm, renderer, 2), fanout)
    }

    fn failing(stage: &'static str) -> ScriptedLlm {
        ScriptedLlm::new(move |req, _| {
            if req.stage == stage {
                Ok(r#"{"unexpected": true}"#.to_string())
            } else {
                Ok(canned_output(&req.stage).to_string())
            }
        })
    }

    #[tokio::test]
    async fn test_full_run_composes_every_stage() {
        let llm = Arc::new(ScriptedLlm::canned());
        let outcome = orchestrator(llm.clone(), 2)
            .run(&sample_record("600000.SH"))
            .await;

        let report = outcome.report().expect("complete report");
        assert_eq!(report.stock_info.ts_code, "600000.SH");
        assert_eq!(report.stage_names(), {
            let mut all = stages::ALL.to_vec();
            all.sort();
            all
        });
        assert!(report.skipped_stages.is_empty());
        assert_eq!(report.analysis_report[stages::OVERALL_ASSESSMENT]["verdict"], "多方惨胜");
        for stage in stages::ALL {
            assert_eq!(llm.calls_for(stage), 1, "{}", stage);
        }
    }

    #[tokio::test]
    async fn test_run_inside_spawned_task() {
        let llm = Arc::new(ScriptedLlm::canned());
        let orchestrator = Arc::new(orchestrator(llm, 3));
        let (_tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let record = sample_record("600000.SH");
            orchestrator.run_until(&record, &rx).await
        });

        assert!(handle.await.unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_no_stage_starts_before_its_dependencies_end() {
        let llm = Arc::new(ScriptedLlm::canned().with_delay(Duration::from_millis(5)));
        orchestrator(llm.clone(), 3)
            .run(&sample_record("600000.SH"))
            .await;

        let events = llm.events();
        let position = |event: &CallEvent| events.iter().position(|e| e == event).unwrap();

        for stage in canonical_stages() {
            let started = position(&CallEvent::Start(stage.name.clone()));
            for dep in stage.dependencies() {
                let ended = position(&CallEvent::End(dep.to_string()));
                assert!(ended < started, "{} started before {} ended", stage.name, dep);
            }
        }
    }

    #[tokio::test]
    async fn test_same_input_gives_same_structure() {
        let orch = orchestrator(Arc::new(ScriptedLlm::canned()), 2);
        let record = sample_record("600000.SH");

        let first = orch.run(&record).await;
        let second = orch.run(&record).await;

        let (a, b) = (first.report().unwrap(), second.report().unwrap());
        assert_eq!(a.stage_names(), b.stage_names());
        assert_eq!(
            a.overall().unwrap().verdict,
            b.overall().unwrap().verdict
        );
        assert_eq!(
            a.overall().unwrap().market_sentiment.level,
            b.overall().unwrap().market_sentiment.level
        );
    }

    #[tokio::test]
    async fn test_mandatory_failure_stops_run() {
        let llm = Arc::new(failing(stages::KEY_FORCES));
        let outcome = orchestrator(llm.clone(), 2)
            .run(&sample_record("600000.SH"))
            .await;

        let failure = outcome.failure().expect("partial failure");
        assert_eq!(failure.first_fatal_stage.as_deref(), Some(stages::KEY_FORCES));
        assert_eq!(failure.status, Some(StageStatus::SchemaInvalid));
        assert!(!failure.retryable);

        let completed: BTreeSet<&str> = failure.completed_stages.iter().map(String::as_str).collect();
        assert_eq!(
            completed,
            BTreeSet::from([stages::LISTING_REASON, stages::HISTORICAL_CONTEXT])
        );

        assert_eq!(llm.calls_for(stages::FINAL_VERDICT), 0);
        assert_eq!(llm.calls_for(stages::BUYER_ANALYSIS), 0);
        assert_eq!(llm.calls_for(stages::OVERALL_ASSESSMENT), 0);
    }

    #[tokio::test]
    async fn test_call_failure_is_retryable() {
        let llm = Arc::new(ScriptedLlm::new(|req, _| {
            if req.stage == stages::OVERALL_ASSESSMENT {
                Err(LlmError::Transport("timeout".to_string()))
            } else {
                Ok(canned_output(&req.stage).to_string())
            }
        }));
        let outcome = orchestrator(llm, 2).run(&sample_record("600000.SH")).await;

        assert!(outcome.is_retryable());
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.first_fatal_stage.as_deref(), Some(stages::OVERALL_ASSESSMENT));
        assert_eq!(failure.status, Some(StageStatus::CallFailed));
    }

    #[tokio::test]
    async fn test_optional_failure_is_skipped() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let seen = prompts.clone();
        let llm = Arc::new(ScriptedLlm::new(move |req, _| {
            if req.stage == stages::FINAL_VERDICT {
                seen.lock().unwrap().push(req.prompt.clone());
            }
            if req.stage == stages::BUYER_ANALYSIS {
                return Ok(r#"{"concentration_level": "极度集中"}"#.to_string());
            }
            Ok(canned_output(&req.stage).to_string())
        }));

        let outcome = orchestrator(llm, 2).run(&sample_record("600000.SH")).await;

        let report = outcome.report().expect("degraded report");
        assert!(report.is_degraded());
        assert_eq!(report.skipped_stages.len(), 1);
        assert_eq!(report.skipped_stages[0].stage, stages::BUYER_ANALYSIS);
        assert_eq!(report.skipped_stages[0].status, StageStatus::SchemaInvalid);
        assert!(!report.analysis_report.contains_key(stages::BUYER_ANALYSIS));
        assert!(report.analysis_report.contains_key(stages::FINAL_VERDICT));

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].matches("不可用").count(), 1);
    }

    #[tokio::test]
    async fn test_missing_history_skips_historical_context() {
        let mut record = sample_record("600000.SH");
        record.historical_data = None;
        let llm = Arc::new(ScriptedLlm::canned());

        let outcome = orchestrator(llm.clone(), 2).run(&record).await;

        let report = outcome.report().unwrap();
        assert_eq!(report.skipped_stages[0].stage, stages::HISTORICAL_CONTEXT);
        assert_eq!(report.skipped_stages[0].status, StageStatus::AbortedDependency);
        assert_eq!(llm.calls_for(stages::HISTORICAL_CONTEXT), 0);
    }

    #[tokio::test]
    async fn test_entry_stages_normal_continuations_high() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let llm = Arc::new(ScriptedLlm::new(move |req, _| {
            log.lock().unwrap().push((req.stage.clone(), req.priority));
            Ok(canned_output(&req.stage).to_string())
        }));

        orchestrator(llm, 2).run(&sample_record("600000.SH")).await;

        for (stage, priority) in seen.lock().unwrap().iter() {
            let expected = match stage.as_str() {
                stages::LISTING_REASON | stages::KEY_FORCES | stages::HISTORICAL_CONTEXT => {
                    Priority::Normal
                }
                _ => Priority::High,
            };
            assert_eq!(*priority, expected, "{}", stage);
        }
    }

    #[tokio::test]
    async fn test_stage_fanout_bounds_in_flight_stages() {
        let llm = Arc::new(ScriptedLlm::canned().with_delay(Duration::from_millis(10)));
        orchestrator(llm.clone(), 1)
            .run(&sample_record("600000.SH"))
            .await;
        assert_eq!(llm.max_in_flight(), 1);

        let llm = Arc::new(ScriptedLlm::canned().with_delay(Duration::from_millis(10)));
        orchestrator(llm.clone(), 3)
            .run(&sample_record("600000.SH"))
            .await;
        assert!(llm.max_in_flight() >= 2);
        assert!(llm.max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let llm = Arc::new(ScriptedLlm::canned());
        let (_tx, rx) = watch::channel(true);

        let outcome = orchestrator(llm.clone(), 2)
            .run_until(&sample_record("600000.SH"), &rx)
            .await;

        let failure = outcome.failure().unwrap();
        assert!(failure.is_cancelled());
        assert!(failure.completed_stages.is_empty());
        assert!(llm.events().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_at_next_layer() {
        let (tx, rx) = watch::channel(false);
        let llm = Arc::new(ScriptedLlm::new(move |req, _| {
            if req.stage == stages::KEY_FORCES {
                tx.send_replace(true);
            }
            Ok(canned_output(&req.stage).to_string())
        }));

        let outcome = orchestrator(llm.clone(), 3)
            .run_until(&sample_record("600000.SH"), &rx)
            .await;

        let failure = outcome.failure().unwrap();
        assert!(failure.is_cancelled());
        assert_eq!(failure.completed_stages.len(), 3);
        assert!(matches!(outcome, PipelineOutcome::Failed(_)));
        assert_eq!(llm.calls_for(stages::OVERALL_ASSESSMENT), 0);
        assert_eq!(llm.calls_for(stages::FINAL_VERDICT), 0);
    }
}
