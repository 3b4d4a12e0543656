//! Shutdown coordination for the server loop and transports.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};

/// Coordinator for shutdown.
///
/// Cloned handles share one broadcast channel; every long-running task
/// subscribes and stops when the signal fires. Dropping handles never
/// counts as a signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. In-flight message tasks are not waited for.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolves when the signal fires.
    pub async fn wait(&self) {
        self.signalled().await
    }

    /// A `'static` future that resolves when the signal fires.
    ///
    /// Subscribes immediately, so a trigger after this call is never missed.
    /// The future holds its own handle and stays pending if every other
    /// handle is dropped.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let keep = self.clone();
        let mut rx = self.subscribe();
        async move {
            let _keep = keep;
            loop {
                match rx.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => return,
                    Err(RecvError::Closed) => std::future::pending::<()>().await,
                }
            }
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signalled_ignores_dropped_handles() {
        let shutdown = Shutdown::new();
        let signalled = shutdown.signalled();
        drop(shutdown);

        let outcome = tokio::time::timeout(Duration::from_millis(50), signalled).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_signalled_fires_on_trigger() {
        let shutdown = Shutdown::new();
        let signalled = shutdown.signalled();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), signalled)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_fires_on_trigger_from_clone() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        let waiter = tokio::spawn(async move { shutdown.wait().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        other.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
