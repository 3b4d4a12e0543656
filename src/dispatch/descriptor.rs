//! What a route points at, and the runnable unit produced per message.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::dispatch::App;
use crate::handler::{Context, Handler, HandlerError, HandlerResult, Instance, Lifecycle};
use crate::message::{Message, Response};
use crate::routing::UrlArgs;

/// Builds a fresh, type-erased handler instance.
pub type Factory = Arc<dyn Fn(Arc<App>, Arc<Message>, UrlArgs) -> Box<dyn Lifecycle> + Send + Sync>;

/// A plain function route.
pub type RouteFn =
    Arc<dyn Fn(Arc<App>, Arc<Message>, UrlArgs) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Target of a route.
#[derive(Clone)]
pub enum Descriptor {
    /// A handler type; one instance per request.
    Class(Factory),
    /// A function called with the app, the message and the captures.
    Function(RouteFn),
}

impl Descriptor {
    /// Route to handler type `H`, built by `factory` for each request.
    pub fn class<H, F>(factory: F) -> Self
    where
        H: Handler,
        F: Fn(Context) -> H + Send + Sync + 'static,
    {
        Descriptor::Class(factory_for(factory))
    }

    pub fn function<F, Fut>(fun: F) -> Self
    where
        F: Fn(Arc<App>, Arc<Message>, UrlArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Descriptor::Function(Arc::new(
            move |app: Arc<App>, message: Arc<Message>, args: UrlArgs| -> BoxFuture<'static, HandlerResult> {
                fun(app, message, args).boxed()
            },
        ))
    }
}

/// Erase handler type `H` behind a [`Factory`]. The method table is built
/// here, once.
pub(crate) fn factory_for<H, F>(factory: F) -> Factory
where
    H: Handler,
    F: Fn(Context) -> H + Send + Sync + 'static,
{
    let table = Arc::new(H::methods());
    Arc::new(
        move |app: Arc<App>, message: Arc<Message>, args: UrlArgs| -> Box<dyn Lifecycle> {
            let cx = Context::new(app, message, H::FLAVOR).with_url_args(args);
            Box::new(Instance::new(factory(cx), table.clone()))
        },
    )
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Class(_) => f.write_str("Descriptor::Class"),
            Descriptor::Function(_) => f.write_str("Descriptor::Function"),
        }
    }
}

/// One routed message, ready to run.
pub enum Invocable {
    Handler(Box<dyn Lifecycle>),
    Function {
        fun: RouteFn,
        app: Arc<App>,
        message: Arc<Message>,
        args: UrlArgs,
    },
}

impl Invocable {
    /// Run to a response. Function failures are rendered by the base handler.
    pub async fn invoke(self) -> Response {
        match self {
            Invocable::Handler(handler) => handler.run().await,
            Invocable::Function {
                fun,
                app,
                message,
                args,
            } => {
                let call = {
                    let app = app.clone();
                    let message = message.clone();
                    async move { fun(app, message, args).await }
                };
                match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(Ok(response)) => response,
                    Ok(Err(err)) => app.base_instance(message).fail(err),
                    Err(panic) => app
                        .base_instance(message)
                        .fail(HandlerError::from_panic(panic)),
                }
            }
        }
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocable::Handler(_) => f.write_str("Invocable::Handler"),
            Invocable::Function { message, args, .. } => f
                .debug_struct("Invocable::Function")
                .field("path", &message.path())
                .field("args", args)
                .finish(),
        }
    }
}
