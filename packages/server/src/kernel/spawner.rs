//! Supervised task handoff for detached job runners.
//!
//! Triggering requests hand their runner future to a [`TaskSpawner`] and
//! return immediately. The spawner keeps a registry of join handles keyed
//! by job id so completion is observable: tests (and shutdown code) can
//! `wait` on a job instead of relying on unstructured fire-and-forget.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

/// Registry of detached runner tasks, keyed by the job they drive.
#[derive(Clone, Default)]
pub struct TaskSpawner {
    tasks: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl TaskSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a detached runner for `job_id`.
    ///
    /// The previous handle for the same job (a finished earlier attempt) is
    /// replaced; runners persist all progress themselves, so dropping the
    /// old handle loses nothing.
    pub async fn spawn<F>(&self, job_id: Uuid, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, h| !h.is_finished());
        tasks.insert(job_id, handle);
    }

    /// Wait for the runner of `job_id` to finish, if one is registered.
    pub async fn wait(&self, job_id: Uuid) {
        let handle = self.tasks.lock().await.remove(&job_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(job_id = %job_id, error = %e, "runner task panicked");
            }
        }
    }

    /// Whether a runner for `job_id` is still executing.
    pub async fn is_running(&self, job_id: Uuid) -> bool {
        self.tasks
            .lock()
            .await
            .get(&job_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn wait_observes_completion() {
        let spawner = TaskSpawner::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let job_id = Uuid::new_v4();

        spawner
            .spawn(job_id, async move {
                flag.store(true, Ordering::SeqCst);
            })
            .await;

        spawner.wait(job_id).await;
        assert!(done.load(Ordering::SeqCst));
        assert!(!spawner.is_running(job_id).await);
    }

    #[tokio::test]
    async fn wait_on_unknown_job_is_a_no_op() {
        let spawner = TaskSpawner::new();
        spawner.wait(Uuid::new_v4()).await;
    }
}
