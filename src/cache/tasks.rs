// Background task spawning.
// Revalidation work runs detached from the request that triggered it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tokio::sync::Notify;

/// Capability to run work after the current response has been sent.
///
/// Implementations must let a spawned task run to completion even when the
/// triggering request has finished.
pub trait BackgroundTasks: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns onto the ambient tokio runtime and tracks tasks still running.
#[derive(Debug, Clone, Default)]
pub struct TokioTasks {
    inner: Arc<Tracker>,
}

#[derive(Debug, Default)]
struct Tracker {
    running: AtomicUsize,
    idle: Notify,
}

impl TokioTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spawned tasks that have not finished.
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Wait until every spawned task has finished.
    pub async fn drain(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.running() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl BackgroundTasks for TokioTasks {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.inner.running.fetch_add(1, Ordering::SeqCst);
        let guard = RunningGuard(Arc::clone(&self.inner));

        tokio::spawn(async move {
            task.await;
            drop(guard);
        });
    }
}

/// Counts a task as finished when dropped, including when it panics or is
/// dropped unpolled at runtime shutdown.
struct RunningGuard(Arc<Tracker>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if self.0.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Queues tasks instead of running them, so tests decide when they run.
#[cfg(test)]
#[derive(Default)]
pub struct ManualTasks {
    queue: std::sync::Mutex<Vec<BoxFuture<'static, ()>>>,
}

#[cfg(test)]
impl ManualTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run every queued task to completion, returning how many ran.
    pub async fn run_all(&self) -> usize {
        let tasks = std::mem::take(&mut *self.queue.lock().unwrap());
        let count = tasks.len();
        for task in tasks {
            task.await;
        }
        count
    }
}

#[cfg(test)]
impl BackgroundTasks for ManualTasks {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.queue.lock().unwrap().push(task);
    }
}
