//! Periodic Task Runner
//!
//! Shared loop behind the background tasks: wait one period, run one tick,
//! repeat until stopped.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a running periodic task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub(crate) struct PeriodicTask {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawns `tick` to run every `period` on the current Tokio runtime.
    ///
    /// The first tick runs one full period after spawning.
    pub(crate) fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(
                task = name,
                period_ms = period.as_millis() as u64,
                "Starting periodic task"
            );

            loop {
                tokio::select! {
                    biased;
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            debug!(task = name, "Periodic task received shutdown signal");
                            return;
                        }
                    }
                    _ = tokio::time::sleep(period) => {}
                }

                if *shutdown_rx.borrow() {
                    return;
                }
                tick().await;
            }
        });

        Self {
            name,
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Asks the task to stop. A tick already running is allowed to finish.
    ///
    /// Never blocks; calling it again has no effect.
    pub(crate) fn stop(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!(task = self.name, "Periodic task stopped");
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the task and waits for any in-flight tick to complete.
    pub(crate) async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                debug!(task = self.name, error = %err, "Periodic task ended abnormally");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
