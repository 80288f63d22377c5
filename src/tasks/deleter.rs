//! TTL Sweep Task
//!
//! Background task that periodically removes expired keys from the store.
//! The sweep holds the store's write lock, so it runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::storage::StorageService;
use crate::tasks::periodic::PeriodicTask;

/// Handle to the running sweep task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Deleter {
    task: PeriodicTask,
}

impl Deleter {
    /// Spawns a task that calls `delete_expired` every `period`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    /// ```ignore
    /// let deleter = Deleter::start(storage.clone(), Duration::from_secs(5));
    /// // Later, during shutdown:
    /// deleter.shutdown().await;
    /// ```
    pub fn start(storage: Arc<StorageService>, period: Duration) -> Self {
        let task = PeriodicTask::spawn("deleter", period, move || {
            let storage = Arc::clone(&storage);
            sweep(storage)
        });
        Self { task }
    }

    /// Requests a stop; an in-flight sweep finishes first.
    pub fn stop(&self) {
        self.task.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the task and waits for it to exit.
    pub async fn shutdown(self) {
        self.task.shutdown().await;
    }
}

async fn sweep(storage: Arc<StorageService>) {
    match tokio::task::spawn_blocking(move || storage.delete_expired()).await {
        Ok(Ok(0)) => debug!("TTL sweep: no expired entries found"),
        Ok(Ok(removed)) => info!(removed, "TTL sweep: removed expired entries"),
        Ok(Err(err)) => warn!(error = %err, "TTL sweep failed"),
        Err(err) => error!(error = %err, "TTL sweep task panicked"),
    }
}
