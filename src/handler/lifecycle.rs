//! The handler lifecycle engine.
//!
//! # Data Flow
//! ```text
//! Created    handler built by its factory, initialize()
//!     ↓
//! Preparing  prepare(); may finish early
//!     ↓
//! Dispatching verb → MethodTable
//!     ├── no method      → unsupported()      (OPTIONS answered for web flavors)
//!     ↓
//! Invoking   method future awaited
//!     ├── Err / panic    → error(err)
//!     ↓
//! Finished   exactly one Response
//!     ↓
//! Finalizing on_finish(), always
//! ```
//!
//! # Design Decisions
//! - `run` never fails; every error and panic becomes a rendered response
//! - Hooks are plain trait methods with defaults; handlers override only
//!   what they need

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::header::{self, HeaderValue};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::handler::context::Context;
use crate::handler::error::HandlerError;
use crate::handler::methods::{HandlerFuture, MethodTable};
use crate::handler::status::{Flavor, StatusKind};
use crate::message::{Method, Response};

/// A request handler type.
///
/// A fresh value is built for every request. Handlers own their
/// [`Context`] and expose their verbs through [`Handler::methods`].
pub trait Handler: Send + Sized + 'static {
    /// How the payload is rendered.
    const FLAVOR: Flavor = Flavor::Web;

    fn context(&self) -> &Context;

    fn context_mut(&mut self) -> &mut Context;

    /// Verbs this handler implements. Called once, at registration.
    fn methods() -> MethodTable<Self>;

    /// Setup run right after construction.
    fn initialize(&mut self) {}

    /// Runs before dispatch. Finishing the context here skips the method.
    fn prepare(&mut self) -> HandlerFuture<'_, ()> {
        futures_util::future::ready(Ok(())).boxed()
    }

    /// Renders the response for a verb the handler does not implement.
    fn unsupported(&mut self, allowed: &[Method]) -> Response {
        let cx = self.context_mut();
        if !cx.flavor().is_web() {
            return cx.render_error(StatusKind::NotAllowed);
        }
        let allow = join_methods(allowed);
        cx.render_error_with(StatusKind::NotAllowed, |cx| {
            if let Ok(value) = HeaderValue::from_str(&allow) {
                cx.payload_mut().headers.insert(header::ALLOW, value);
            }
        })
    }

    /// Translates a failure into a response.
    fn error(&mut self, err: HandlerError) -> Response {
        self.context_mut().render_error(err.status_kind())
    }

    /// Renders the current payload.
    fn render(&mut self) -> Response {
        self.context_mut().render()
    }

    /// Runs after the response is produced, whatever happened.
    fn on_finish(&mut self) {}
}

/// Drive `handler` through its lifecycle.
pub async fn run<H: Handler>(mut handler: H, table: &MethodTable<H>) -> Response {
    let response = drive(&mut handler, table).await;
    finalize(&mut handler);
    response
}

async fn drive<H: Handler>(handler: &mut H, table: &MethodTable<H>) -> Response {
    match AssertUnwindSafe(handler.prepare()).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return contain(handler, err),
        Err(panic) => return contain(handler, HandlerError::from_panic(panic)),
    }
    if handler.context().is_finished() {
        return guarded(handler, |h| h.render());
    }

    let method = handler.context().message().method();
    let Some(fun) = method.and_then(|m| table.lookup(m)) else {
        if method == Some(Method::Options) && handler.context().flavor().is_web() {
            return guarded(handler, |h| answer_options(h, table));
        }
        let allowed = table.allowed();
        tracing::debug!(
            request_id = %handler.context().message().id(),
            verb = %handler.context().message().verb(),
            "Verb not implemented"
        );
        let response = guarded(handler, |h| h.unsupported(&allowed));
        handler.context_mut().finish();
        return response;
    };

    let args = handler.context().url_args().clone();
    let response = match AssertUnwindSafe(fun(&mut *handler, args)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => contain(handler, err),
        Err(panic) => contain(handler, HandlerError::from_panic(panic)),
    };
    handler.context_mut().finish();
    response
}

/// Run a synchronous hook, turning a panic into an error response.
fn guarded<H: Handler>(handler: &mut H, hook: impl FnOnce(&mut H) -> Response) -> Response {
    match std::panic::catch_unwind(AssertUnwindSafe(|| hook(handler))) {
        Ok(response) => response,
        Err(panic) => contain(handler, HandlerError::from_panic(panic)),
    }
}

/// Log `err` and hand it to the handler's `error` hook.
fn contain<H: Handler>(handler: &mut H, err: HandlerError) -> Response {
    let message = handler.context().message_arc();
    tracing::error!(
        request_id = %message.id(),
        method = %message.verb(),
        path = %message.path(),
        error = %err,
        "Handler failed"
    );

    match std::panic::catch_unwind(AssertUnwindSafe(|| handler.error(err))) {
        Ok(response) => response,
        Err(panic) => {
            tracing::error!(
                request_id = %message.id(),
                error = %HandlerError::from_panic(panic),
                "Error hook panicked"
            );
            let cx = handler.context_mut();
            cx.finish();
            Response::new(cx.flavor().default_status(), Bytes::new())
        }
    }
}

fn finalize<H: Handler>(handler: &mut H) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| handler.on_finish())) {
        tracing::error!(
            request_id = %handler.context().message().id(),
            error = %HandlerError::from_panic(panic),
            "on_finish hook panicked"
        );
    }
}

fn answer_options<H: Handler>(handler: &mut H, table: &MethodTable<H>) -> Response {
    let mut allowed = table.allowed();
    allowed.push(Method::Options);
    let allow = join_methods(&allowed);

    let cx = handler.context_mut();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        cx.payload_mut().headers.insert(header::ALLOW, value.clone());
        cx.payload_mut()
            .headers
            .insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    cx.set_status_kind(StatusKind::Ok);
    handler.render()
}

fn join_methods(methods: &[Method]) -> String {
    methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", ")
}

/// A handler instance ready to run, with its type erased.
pub trait Lifecycle: Send {
    fn run(self: Box<Self>) -> BoxFuture<'static, Response>;

    /// Skip dispatch and render the handler's unsupported-verb response.
    fn unsupported(self: Box<Self>) -> Response;

    /// Skip dispatch and render `err` through the handler's error hook.
    fn fail(self: Box<Self>, err: HandlerError) -> Response;
}

/// A constructed handler paired with its method table.
pub struct Instance<H: Handler> {
    handler: H,
    table: Arc<MethodTable<H>>,
}

impl<H: Handler> Instance<H> {
    pub fn new(mut handler: H, table: Arc<MethodTable<H>>) -> Self {
        handler.initialize();
        Self { handler, table }
    }
}

impl<H: Handler> Lifecycle for Instance<H> {
    fn run(self: Box<Self>) -> BoxFuture<'static, Response> {
        let Instance { handler, table } = *self;
        async move { run(handler, &table).await }.boxed()
    }

    fn unsupported(self: Box<Self>) -> Response {
        let Instance { mut handler, table } = *self;
        let allowed = table.allowed();
        let response = guarded(&mut handler, |h| h.unsupported(&allowed));
        finalize(&mut handler);
        response
    }

    fn fail(self: Box<Self>, err: HandlerError) -> Response {
        let mut handler = self.handler;
        let response = contain(&mut handler, err);
        finalize(&mut handler);
        response
    }
}
