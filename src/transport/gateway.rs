//! HTTP gateway transport.
//!
//! # Responsibilities
//! - Accept HTTP requests directly with axum
//! - Turn each request into a `Message` and hand it to the server loop
//! - Hold the connection open until the loop replies
//!
//! # Data Flow
//! ```text
//! client → axum (request-id, trace, timeout) → accept()
//!     → Message (Origin::Gateway) ──mpsc──→ Gateway::recv
//!     → pending[id] = oneshot
//! Gateway::reply → pending.remove(id) → oneshot → accept() → HTTP response
//! ```
//!
//! # Design Decisions
//! - Replies are correlated by message id, so they may arrive in any order
//! - A request that times out or disconnects removes its pending entry
//! - Only `Shutdown::trigger` stops the listener; dropping handles does not

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::any,
    Router,
};
use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, Mutex};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::message::{Message, Origin, Response};
use crate::server::shutdown::Shutdown;
use crate::server::transport::{Transport, TransportError};

const INBOX_CAPACITY: usize = 1024;

type Pending = Arc<DashMap<Uuid, oneshot::Sender<Response>>>;

#[derive(Clone)]
struct GatewayState {
    inbox: mpsc::Sender<Message>,
    pending: Pending,
    max_body_bytes: usize,
}

/// Server-loop side of the HTTP gateway.
pub struct Gateway {
    inbox: Mutex<mpsc::Receiver<Message>>,
    pending: Pending,
    local_addr: SocketAddr,
}

impl Gateway {
    /// Bind `config.bind_address` and start serving.
    pub async fn bind(config: &GatewayConfig, shutdown: Shutdown) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(&config.bind_address).await?;
        Self::serve(listener, config, shutdown)
    }

    /// Start serving on an already bound listener.
    pub fn serve(
        listener: TcpListener,
        config: &GatewayConfig,
        shutdown: Shutdown,
    ) -> Result<Self, TransportError> {
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let pending = Pending::default();

        let state = GatewayState {
            inbox: tx,
            pending: pending.clone(),
            max_body_bytes: config.max_body_bytes,
        };
        let router = build_router(state, Duration::from_secs(config.request_timeout_secs));

        let stop = shutdown.signalled();
        tokio::spawn(async move {
            tracing::info!(address = %local_addr, "Gateway listening");
            let result = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(stop)
            .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Gateway failed");
            }
            tracing::info!("Gateway stopped");
        });

        Ok(Self {
            inbox: Mutex::new(rx),
            pending,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests waiting for a reply.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Transport for Gateway {
    async fn recv(&self) -> Result<Option<Message>, TransportError> {
        Ok(self.inbox.lock().await.recv().await)
    }

    async fn reply(&self, message: &Message, response: &Response) -> Result<(), TransportError> {
        let (_, waiter) = self
            .pending
            .remove(&message.id())
            .ok_or(TransportError::UnknownRequest(message.id()))?;
        waiter
            .send(response.clone())
            .map_err(|_| TransportError::Closed)
    }
}

fn build_router(state: GatewayState, timeout: Duration) -> Router {
    Router::new()
        .route("/", any(accept))
        .route("/{*path}", any(accept))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)),
        )
}

/// Removes the pending entry when the request future ends, however it ends.
struct PendingGuard {
    pending: Pending,
    id: Uuid,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

async fn accept(
    State(state): State<GatewayState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response(),
    };

    let remote = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string());

    let message = Message::builder(parts.method.as_str(), parts.uri.path())
        .origin(Origin::Gateway)
        .conn_id(peer.to_string())
        .query(parts.uri.query().unwrap_or_default())
        .version(format!("{:?}", parts.version))
        .remote_addr(remote)
        .headers(parts.headers)
        .body(body)
        .build();

    let id = message.id();
    let (tx, rx) = oneshot::channel();
    state.pending.insert(id, tx);
    let _guard = PendingGuard {
        pending: state.pending.clone(),
        id,
    };

    if state.inbox.send(message).await.is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response();
    }

    match rx.await {
        Ok(response) => into_http(response),
        Err(_) => {
            tracing::warn!(request_id = %id, "Request dropped without a reply");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn into_http(response: Response) -> axum::response::Response {
    let status = response.status.http_status();
    let mut out = axum::response::Response::new(Body::from(response.body));
    *out.status_mut() = status;
    *out.headers_mut() = response.headers;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Status;
    use axum::http::header;

    #[test]
    fn test_into_http_maps_message_codes() {
        let mut response = Response::new(Status::new(-3, "Not Found"), "gone");
        response
            .headers
            .insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        let http = into_http(response);
        assert_eq!(http.status(), StatusCode::NOT_FOUND);
        assert_eq!(http.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn test_reply_to_unknown_message() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gateway = Gateway::serve(listener, &GatewayConfig::default(), Shutdown::new()).unwrap();
        let message = Message::builder("GET", "/").build();
        let response = Response::new(Status::new(200, "OK"), "");
        assert!(matches!(
            gateway.reply(&message, &response).await,
            Err(TransportError::UnknownRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        // No handle to the shutdown outlives this call.
        let gateway = Gateway::serve(listener, &GatewayConfig::default(), Shutdown::new()).unwrap();
        let url = format!("http://{}/echo?x=1", gateway.local_addr());

        let client = tokio::spawn(async move { reqwest::get(url).await.unwrap() });

        let message = gateway.recv().await.unwrap().unwrap();
        assert_eq!(message.path(), "/echo");
        assert_eq!(message.query(), Some("x=1"));
        assert_eq!(message.origin(), Origin::Gateway);
        assert!(message.header("x-request-id").is_some());
        assert_eq!(gateway.pending(), 1);

        let response = Response::new(Status::new(201, "Created"), "made");
        gateway.reply(&message, &response).await.unwrap();

        let http = client.await.unwrap();
        assert_eq!(http.status(), reqwest::StatusCode::CREATED);
        assert_eq!(http.text().await.unwrap(), "made");
        assert_eq!(gateway.pending(), 0);
    }

    #[tokio::test]
    async fn test_trigger_stops_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Shutdown::new();
        let gateway = Gateway::serve(listener, &GatewayConfig::default(), shutdown.clone()).unwrap();
        let addr = gateway.local_addr();

        shutdown.trigger();
        let next = tokio::time::timeout(std::time::Duration::from_secs(2), gateway.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(next.is_none());

        let refused = reqwest::get(format!("http://{addr}/")).await;
        assert!(refused.is_err());
    }
}
