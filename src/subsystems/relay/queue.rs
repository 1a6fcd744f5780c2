//! Single-consumer FIFO queue for relay tasks.
//!
//! Every accepted message becomes one [`PendingTask`]. The [`RelayWorker`]
//! runs tasks strictly one at a time in enqueue order, so replies go out in
//! arrival order and the backend never sees concurrent requests from this
//! process. A task that fails or panics is logged and the worker moves on.
//!
//! Ordering holds from the moment of [`RelayQueue::enqueue`]. Producers that
//! handle events concurrently (the Discord gateway spawns a task per event)
//! can enqueue near-simultaneous messages in either order.
//!
//! The queue is unbounded and in-flight tasks cannot be cancelled; a task
//! that never completes stalls everything behind it.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// One unit of queued work and a label for the logs.
pub struct PendingTask {
    pub label: String,
    pub future: TaskFuture,
}

/// Cloneable producer side of the queue.
#[derive(Clone)]
pub struct RelayQueue {
    tx: mpsc::UnboundedSender<PendingTask>,
}

impl RelayQueue {
    /// Create the queue and the worker that drains it.
    pub fn new() -> (Self, RelayWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, RelayWorker { rx })
    }

    /// Append a task. Fails only after the worker has stopped.
    pub fn enqueue<F>(&self, label: impl Into<String>, future: F) -> Result<(), AppError>
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let task = PendingTask { label: label.into(), future: Box::pin(future) };
        self.tx
            .send(task)
            .map_err(|e| AppError::Relay(format!("relay worker stopped, dropping task '{}'", e.0.label)))
    }
}

/// Consumer side; runs as a [`Component`] for the process lifetime.
pub struct RelayWorker {
    rx: mpsc::UnboundedReceiver<PendingTask>,
}

impl RelayWorker {
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("relay worker running");

        loop {
            let task = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("relay worker shutting down");
                    break;
                }

                task = self.rx.recv() => match task {
                    Some(task) => task,
                    None => {
                        info!("relay queue closed, worker exiting");
                        break;
                    }
                },
            };

            run_task(task).await;
        }
    }
}

impl Component for RelayWorker {
    fn id(&self) -> &str {
        "relay-worker"
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            (*self).run(shutdown).await;
            Ok(())
        })
    }
}

/// Run one task to completion. Spawning isolates panics from the worker loop;
/// awaiting the handle keeps execution strictly sequential.
async fn run_task(task: PendingTask) {
    let PendingTask { label, future } = task;
    debug!(task = %label, "relay task started");

    match tokio::spawn(future).await {
        Ok(Ok(())) => debug!(task = %label, "relay task finished"),
        Ok(Err(e)) => error!(task = %label, error = %e, "relay task failed"),
        Err(e) if e.is_panic() => error!(task = %label, error = %e, "relay task panicked"),
        Err(e) => warn!(task = %label, error = %e, "relay task cancelled"),
    }
}
