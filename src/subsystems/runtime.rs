//! Component runtime: runs the relay worker and the chat channels side by side.
//!
//! A [`Component`] is an independently-runnable unit (the relay queue worker,
//! the Discord gateway channel) that captures its shared state at
//! construction. [`spawn_components`] starts each one as a Tokio task and
//! returns a [`SubsystemHandle`] that resolves once every component exited.
//! Any component error or panic cancels the shared [`CancellationToken`] so
//! siblings shut down too.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

// ── Component ─────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable unit.
///
/// [`Component::run`] is called once and should return when `shutdown` is
/// cancelled or the component's own work is done.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the component and return its run-loop as a boxed future.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

// ── SubsystemHandle ───────────────────────────────────────────────────────────

/// Handle to a running component set. `.await` it via [`SubsystemHandle::join`].
pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Relay(format!("component manager panicked: {e}"))),
        }
    }
}

// ── spawn_components ──────────────────────────────────────────────────────────

/// Spawn each [`Component`] as its own Tokio task.
///
/// - A component returning `Err` or panicking cancels `shutdown`.
/// - The handle resolves after all components exit, with the first error.
pub fn spawn_components(
    components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            let id = component.id().to_string();
            debug!(component = %id, "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Relay(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("component error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    SubsystemHandle { inner: handle }
}
