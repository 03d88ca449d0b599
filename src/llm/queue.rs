use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, info};

use super::{LlmCall, LlmRequest};
use crate::error::LlmError;

/// Priority level for LLM requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// High priority: continuation stages of a stock already in flight
    High,
    /// Normal priority: entry stages of a stock
    Normal,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
        }
    }
}

/// A request to be queued for LLM processing
struct QueuedRequest {
    request: LlmRequest,
    response_tx: oneshot::Sender<Result<String, LlmError>>,
}

/// LLM Queue that limits concurrent requests and prioritizes continuations.
///
/// Every stage call of every stock passes through one queue, so
/// `max_concurrent` bounds the load on the shared model endpoint.
#[derive(Clone)]
pub struct LLMQueue {
    high_tx: mpsc::Sender<QueuedRequest>,
    normal_tx: mpsc::Sender<QueuedRequest>,
}

impl LLMQueue {
    /// Create a new LLM Queue in front of `client`. Must be called inside a
    /// tokio runtime.
    pub fn new(client: Arc<dyn LlmCall>, max_concurrent: usize, queue_size: usize) -> Self {
        let (high_tx, high_rx) = mpsc::channel::<QueuedRequest>(queue_size.max(1));
        let (normal_tx, normal_rx) = mpsc::channel::<QueuedRequest>(queue_size.max(1));

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

        tokio::spawn(Self::process_queue(client, semaphore, high_rx, normal_rx));

        Self { high_tx, normal_tx }
    }

    /// Process queued requests, prioritizing high-priority over normal-priority
    async fn process_queue(
        client: Arc<dyn LlmCall>,
        semaphore: Arc<Semaphore>,
        mut high_rx: mpsc::Receiver<QueuedRequest>,
        mut normal_rx: mpsc::Receiver<QueuedRequest>,
    ) {
        info!(
            "📬 [QUEUE] LLM Queue processor started (max concurrent: {})",
            semaphore.available_permits()
        );

        loop {
            // Wait for a free slot first so the priority choice is made at
            // dispatch time, not at arrival time.
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                info!("📬 [QUEUE] Semaphore closed, shutting down");
                break;
            };

            let queued = tokio::select! {
                biased;

                Some(req) = high_rx.recv() => req,
                Some(req) = normal_rx.recv() => req,
                else => {
                    info!("📬 [QUEUE] All channels closed, shutting down");
                    break;
                }
            };

            debug!(
                "📬 [QUEUE] Dispatching {} priority request for {}. {} slots remaining",
                queued.request.priority.as_str(),
                queued.request.stage,
                semaphore.available_permits()
            );

            let client = client.clone();
            tokio::spawn(async move {
                let result = client.call(queued.request).await;
                let _ = queued.response_tx.send(result);
                drop(permit);
            });
        }
    }
}

#[async_trait]
impl LlmCall for LLMQueue {
    async fn call(&self, request: LlmRequest) -> Result<String, LlmError> {
        let (response_tx, response_rx) = oneshot::channel();
        let priority = request.priority;
        let queued = QueuedRequest {
            request,
            response_tx,
        };

        let send_result = match priority {
            Priority::High => self.high_tx.send(queued).await,
            Priority::Normal => self.normal_tx.send(queued).await,
        };
        if send_result.is_err() {
            return Err(LlmError::QueueClosed);
        }

        response_rx.await.unwrap_or(Err(LlmError::Cancelled))
    }
}
