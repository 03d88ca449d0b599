use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::batch::BatchSummary;
use crate::config::AppConfig;
use crate::services::day_runner::DayRunner;

/// Errors surfaced by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("A day run is already in progress")]
    AlreadyRunning,

    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("No report found yet. Start a run first.")]
    NoReport,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::AlreadyRunning => StatusCode::CONFLICT,
            ApiError::InputNotFound(_) => StatusCode::BAD_REQUEST,
            ApiError::NoReport => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

struct ActiveRun {
    handle: JoinHandle<()>,
    cancel: watch::Sender<bool>,
}

pub struct AppState {
    pub runner: DayRunner,
    pub config: AppConfig,
    active: Mutex<Option<ActiveRun>>,
    last_summary: Arc<Mutex<Option<BatchSummary>>>,
}

impl AppState {
    pub fn new(runner: DayRunner, config: AppConfig) -> Self {
        Self {
            runner,
            config,
            active: Mutex::new(None),
            last_summary: Arc::new(Mutex::new(None)),
        }
    }

    /// Ask the running day, if any, to stop admitting stages.
    pub fn cancel_active(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.as_ref() {
            Some(run) if !run.handle.is_finished() => {
                run.cancel.send_replace(true);
                true
            }
            _ => false,
        }
    }

    /// Start a day run in the background and return its run id.
    pub fn start_run(&self, input_path: PathBuf, skip_existing: bool) -> Result<String, ApiError> {
        if !input_path.exists() {
            return Err(ApiError::InputNotFound(input_path.display().to_string()));
        }

        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.as_ref().is_some_and(|run| !run.handle.is_finished()) {
            return Err(ApiError::AlreadyRunning);
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let runner = self.runner.clone();
        let last_summary = self.last_summary.clone();
        let run_id = DayRunner::new_run_id();
        let task_run_id = run_id.clone();

        let handle = tokio::spawn(async move {
            match runner.run_file(task_run_id, &input_path, skip_existing, cancel_rx).await {
                Ok(run) => {
                    info!("🏁 [API] Run {} finished for {}", run.run_id, run.trade_date);
                    *last_summary.lock().unwrap_or_else(|e| e.into_inner()) = Some(run.summary);
                }
                Err(e) => error!("❌ [API] Day run failed for {}: {}", input_path.display(), e),
            }
        });

        *active = Some(ActiveRun {
            handle,
            cancel: cancel_tx,
        });
        Ok(run_id)
    }

    /// Wait for the current day run, if any, to write its outcomes.
    pub async fn join_active(&self) {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(run) = active {
            info!("⏳ [API] Waiting for the active day run to finish");
            if let Err(e) = run.handle.await {
                error!("❌ [API] Day run task ended abnormally: {}", e);
            }
        }
    }

    pub fn last_summary(&self) -> Option<BatchSummary> {
        self.last_summary
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/runs", post(start_run))
        .route("/stop", post(stop_run))
        .route("/report", get(get_report))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run_server(
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let bind = state.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("🌐 API Server listening on {}", bind);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

#[derive(Deserialize)]
struct RunRequest {
    input_path: PathBuf,
    skip_existing: Option<bool>,
}

async fn start_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let skip_existing = request
        .skip_existing
        .unwrap_or(state.config.batch.skip_existing);
    let run_id = state.start_run(request.input_path.clone(), skip_existing)?;

    Ok(Json(json!({
        "status": "started",
        "run_id": run_id,
        "input_path": request.input_path,
        "skip_existing": skip_existing,
    })))
}

async fn stop_run(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.cancel_active() {
        Json(json!({"status": "stopping"}))
    } else {
        Json(json!({"status": "not_running"}))
    }
}

async fn get_report(State(state): State<Arc<AppState>>) -> Result<Json<BatchSummary>, ApiError> {
    state.last_summary().map(Json).ok_or(ApiError::NoReport)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}
