//! Snapshot Task
//!
//! Background task that periodically writes the store to its snapshot file.
//! Restoring happens once at startup through `StorageService::load`, not here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::storage::StorageService;
use crate::tasks::periodic::PeriodicTask;

/// Handle to the running snapshot task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Dumper {
    task: PeriodicTask,
}

impl Dumper {
    /// Spawns a task that calls `dump` every `period`.
    ///
    /// Each dump runs on the blocking pool since it writes the file while
    /// holding the store lock.
    pub fn start(storage: Arc<StorageService>, period: Duration) -> Self {
        let task = PeriodicTask::spawn("dumper", period, move || {
            let storage = Arc::clone(&storage);
            async move { write_snapshot(storage).await }
        });
        Self { task }
    }

    /// Requests a stop; an in-flight dump finishes first.
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

async fn write_snapshot(storage: Arc<StorageService>) {
    match tokio::task::spawn_blocking(move || storage.dump()).await {
        Ok(Ok(())) => debug!("Snapshot tick complete"),
        Ok(Err(err)) => warn!(error = %err, "Snapshot write failed"),
        Err(err) => error!(error = %err, "Snapshot task panicked"),
    }
}
