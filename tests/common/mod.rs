//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;

use switchyard::handler::{Context, Handler, HandlerError, HandlerFuture, MethodTable};
use switchyard::message::{Message, Response};
use switchyard::routing::UrlArgs;
use switchyard::App;

/// `GET` greets the `name` capture (or first positional capture).
pub struct Greet {
    cx: Context,
}

impl Greet {
    pub fn new(cx: Context) -> Self {
        Self { cx }
    }

    fn get(&mut self, args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let name = args
                .get("name")
                .or_else(|| args.positional(0))
                .unwrap_or("nobody")
                .to_string();
            self.cx.set_body(format!("Hello, {name}"));
            Ok(self.cx.render())
        }
        .boxed()
    }
}

impl Handler for Greet {
    fn context(&self) -> &Context {
        &self.cx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new().get(Greet::get)
    }
}

/// `GET` sleeps for `?ms=` milliseconds, then echoes the value.
pub struct Sleepy {
    cx: Context,
}

impl Sleepy {
    pub fn new(cx: Context) -> Self {
        Self { cx }
    }

    fn get(&mut self, _args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let ms: u64 = self
                .cx
                .require_argument("ms")?
                .parse()
                .map_err(|_| HandlerError::BadRequest("ms must be a number".into()))?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            self.cx.set_body(ms.to_string());
            Ok(self.cx.render())
        }
        .boxed()
    }
}

impl Handler for Sleepy {
    fn context(&self) -> &Context {
        &self.cx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new().get(Sleepy::get)
    }
}

pub async fn send(app: &Arc<App>, verb: &str, path: &str) -> Response {
    app.handle(Message::builder(verb, path).build()).await
}

pub async fn send_json(app: &Arc<App>, verb: &str, path: &str, body: &str) -> Response {
    let message = Message::builder(verb, path)
        .header("content-type", "application/json")
        .body(body.to_string())
        .build();
    app.handle(message).await
}

pub fn json_body(response: &Response) -> serde_json::Value {
    serde_json::from_slice(&response.body).unwrap()
}
