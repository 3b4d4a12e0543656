//! The receive → dispatch → reply loop.

use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tracing::Instrument;

use crate::dispatch::App;
use crate::message::Message;
use crate::observability::{message_span, metrics};
use crate::server::executor::{Executor, TaskPool};
use crate::server::shutdown::Shutdown;
use crate::server::transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Pulls messages from a transport and handles each on the executor.
pub struct Server<T: Transport, E: Executor = TaskPool> {
    app: Arc<App>,
    transport: Arc<T>,
    executor: E,
    shutdown: Shutdown,
}

impl<T: Transport, E: Executor> Server<T, E> {
    pub fn new(app: Arc<App>, transport: T, executor: E) -> Self {
        Self {
            app,
            transport: Arc::new(transport),
            executor,
            shutdown: Shutdown::new(),
        }
    }

    /// Stop the loop when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Run until the transport closes or shutdown fires.
    ///
    /// Malformed messages are logged and skipped; other transport failures
    /// end the loop with an error.
    pub async fn run(self) -> Result<(), ServerError> {
        let mut stop = self.shutdown.subscribe();
        tracing::info!("Server loop started");

        loop {
            let next = tokio::select! {
                _ = stop.recv() => {
                    tracing::info!(in_flight = self.executor.in_flight(), "Server loop stopping");
                    break;
                }
                next = self.transport.recv() => next,
            };

            let message = match next {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!("Transport closed");
                    break;
                }
                Err(TransportError::Parse(e)) => {
                    metrics::record_transport_error("recv");
                    tracing::warn!(error = %e, "Dropping malformed message");
                    continue;
                }
                Err(e) => {
                    metrics::record_transport_error("recv");
                    return Err(e.into());
                }
            };

            if message.is_disconnect() {
                tracing::debug!(conn_id = %message.conn_id(), "Client disconnected");
                continue;
            }

            let span = message_span(&message);
            let task = process(self.app.clone(), self.transport.clone(), message).instrument(span);
            self.executor.submit(task.boxed()).await;
        }

        Ok(())
    }
}

/// Route, run and reply to one message.
pub async fn process<T: Transport>(app: Arc<App>, transport: Arc<T>, message: Message) {
    let started = Instant::now();
    let message = Arc::new(message);

    let response = app.route_message(message.clone()).invoke().await;
    if let Err(e) = transport.reply(&message, &response).await {
        metrics::record_transport_error("reply");
        tracing::error!(error = %e, "Failed to deliver response");
    }
    metrics::record_message(response.status.code, started);
}
