//! Where message tasks run.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// Runs message tasks concurrently.
pub trait Executor: Send + Sync + 'static {
    /// Start `task`. May wait for capacity before returning.
    fn submit(&self, task: BoxFuture<'static, ()>) -> impl Future<Output = ()> + Send;

    /// Tasks currently running.
    fn in_flight(&self) -> usize;
}

/// One tokio task per message, at most `size` at a time.
///
/// When the pool is full `submit` waits, which stops the server loop from
/// reading further messages. The in-flight gauge is updated as tasks start
/// and as they end.
#[derive(Debug, Clone)]
pub struct TaskPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl TaskPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn release(&self, permit: OwnedSemaphorePermit) {
        drop(permit);
        metrics::record_in_flight(self.in_flight());
    }
}

impl Executor for TaskPool {
    async fn submit(&self, task: BoxFuture<'static, ()>) {
        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            tracing::error!("Task pool closed, dropping task");
            return;
        };
        metrics::record_in_flight(self.in_flight());
        let pool = self.clone();
        tokio::spawn(async move {
            task.await;
            pool.release(permit);
        });
    }

    fn in_flight(&self) -> usize {
        self.size - self.permits.available_permits()
    }
}
