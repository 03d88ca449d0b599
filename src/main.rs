use dragon_tiger_analyst::api::{run_server, AppState};
use dragon_tiger_analyst::batch::BatchCoordinator;
use dragon_tiger_analyst::config::AppConfig;
use dragon_tiger_analyst::llm::{LLMClient, LLMQueue, LlmCall};
use dragon_tiger_analyst::pipeline::{PipelineOrchestrator, PromptRenderer, StageExecutor};
use dragon_tiger_analyst::services::day_runner::DayRunner;
use dragon_tiger_analyst::services::report_store::ReportStore;
use dragon_tiger_analyst::stages::canonical_graph;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Dragon-Tiger Analyst...");

    // Load Configuration
    let config = AppConfig::load()?;
    info!(
        "Loaded Configuration: model={}, output_dir={}",
        config.llm.model,
        config.output_dir.display()
    );
    if let Some(url) = &config.llm.base_url {
        info!("Using Custom OpenAI Base URL: {}", url);
    }

    // Create LLM Queue with max concurrent requests from config
    info!(
        "📬 Initializing LLM Queue (max concurrent: {}, size: {})...",
        config.llm_max_concurrent, config.llm_queue_size
    );
    let client: Arc<dyn LlmCall> = Arc::new(LLMClient::from_config(&config.llm));
    let queue: Arc<dyn LlmCall> = Arc::new(LLMQueue::new(
        client,
        config.llm_max_concurrent,
        config.llm_queue_size,
    ));

    // Build and validate the stage graph once
    let renderer = Arc::new(PromptRenderer::new());
    let graph = Arc::new(canonical_graph(&renderer)?);
    info!("🧩 Stage layers: {:?}", graph.layer_names());

    let executor = StageExecutor::new(queue, renderer, config.pipeline.max_attempts);
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        graph,
        executor,
        config.pipeline.stage_fanout,
    ));
    let coordinator = Arc::new(BatchCoordinator::new(
        orchestrator,
        config.batch.concurrency,
        config.batch.call_failed_retry_passes,
    ));
    let runner = DayRunner::new(coordinator, ReportStore::new(config.output_dir.clone()));

    // One-shot mode: analyse a day file and exit
    if let Some(input) = std::env::args().nth(1) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 Ctrl-C received, finishing in-flight stages");
                cancel_tx.send_replace(true);
            }
        });

        let run = runner
            .run_file(
                DayRunner::new_run_id(),
                &PathBuf::from(input),
                config.batch.skip_existing,
                cancel_rx,
            )
            .await?;
        info!(
            "🏁 Done: {}/{} stocks reported for {}",
            run.summary.reported(),
            run.summary.total,
            run.trade_date
        );
        return Ok(());
    }

    // Start API Server
    info!("Initializing API Server...");
    let state = Arc::new(AppState::new(runner, config));
    let shutdown_state = state.clone();
    run_server(state.clone(), async move {
        let _ = tokio::signal::ctrl_c().await;
        warn!("🛑 Ctrl-C received, shutting down");
        shutdown_state.cancel_active();
    })
    .await?;

    // Let a cancelled day run write its failure reports and summary
    state.join_active().await;

    Ok(())
}
