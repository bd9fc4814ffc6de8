//! Fire-and-forget background work owned by the SDK instance.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, warn};

#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current tokio runtime.
    ///
    /// Returns false, and drops the task, when called outside a runtime.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime available; background task dropped");
            return false;
        };
        let handle = runtime.spawn(task);
        let mut handles = self.lock_handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        true
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.lock_handles()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait until every spawned task, including ones spawned by tasks that
    /// were waited on, has finished.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.lock_handles());
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(err) = handle.await {
                    if err.is_panic() {
                        error!(error = %err, "background task panicked");
                    }
                }
            }
        }
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(|p| p.into_inner())
    }
}
