//! End-to-end dispatch through `App::handle`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;

use switchyard::handler::{Context, Handler, HandlerError, HandlerFuture, MethodTable, StatusKind};
use switchyard::message::{Message, Method, Response, Status};
use switchyard::routing::UrlArgs;
use switchyard::security::{authenticated, signing, web_authenticated, CookieAuthenticator};
use switchyard::{App, AppSettings, HandlerResult};

mod common;
use common::{send, Greet};

#[tokio::test]
async fn test_greet_by_named_capture() {
    let mut builder = App::builder();
    builder
        .add_handler(r"^/greet/(?P<name>\w+)$", Greet::new)
        .unwrap();
    let app = builder.build();

    let response = send(&app, "GET", "/greet/Ada").await;
    assert_eq!(response.status.code, 200);
    assert_eq!(response.body_text(), "Hello, Ada");
}

#[tokio::test]
async fn test_positional_capture() {
    let mut builder = App::builder();
    builder.add_handler(r"^/item/(\w+)$", Greet::new).unwrap();
    let app = builder.build();

    let response = send(&app, "GET", "/item/42").await;
    assert_eq!(response.body_text(), "Hello, 42");
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    async fn root(_: Arc<App>, _: Arc<Message>, _: UrlArgs) -> HandlerResult {
        Ok(Response::new(Status::new(200, "OK"), "root"))
    }
    async fn fallback(_: Arc<App>, _: Arc<Message>, _: UrlArgs) -> HandlerResult {
        Ok(Response::new(Status::new(200, "OK"), "fallback"))
    }

    let mut builder = App::builder();
    builder
        .add_route(r"^/$", &[], root)
        .unwrap()
        .add_route(r"^/", &[], fallback)
        .unwrap();
    let app = builder.build();

    assert_eq!(send(&app, "GET", "/").await.body_text(), "root");
    assert_eq!(send(&app, "GET", "/other").await.body_text(), "fallback");
}

#[tokio::test]
async fn test_unmatched_path_uses_base_handler() {
    let app = App::builder().build();
    let response = send(&app, "GET", "/missing").await;
    assert_eq!(response.status.code, 404);
}

#[tokio::test]
async fn test_unsupported_verb_lists_allowed() {
    let mut builder = App::builder();
    builder.add_handler(r"^/greet/(?P<name>\w+)$", Greet::new).unwrap();
    let app = builder.build();

    let response = send(&app, "POST", "/greet/Ada").await;
    assert_eq!(response.status.code, 405);
    assert_eq!(response.header("allow"), Some("GET"));
}

#[tokio::test]
async fn test_options_answered_for_web_handlers() {
    let mut builder = App::builder();
    builder.add_handler(r"^/greet/(?P<name>\w+)$", Greet::new).unwrap();
    let app = builder.build();

    let response = send(&app, "OPTIONS", "/greet/Ada").await;
    assert_eq!(response.status.code, 200);
    assert_eq!(response.header("allow"), Some("GET, OPTIONS"));
}

#[tokio::test]
async fn test_function_route_failures_are_contained() {
    async fn broken(_: Arc<App>, _: Arc<Message>, _: UrlArgs) -> HandlerResult {
        Err(HandlerError::other("database unreachable"))
    }
    async fn explodes(_: Arc<App>, _: Arc<Message>, _: UrlArgs) -> HandlerResult {
        panic!("kaboom")
    }
    async fn missing(_: Arc<App>, _: Arc<Message>, _: UrlArgs) -> HandlerResult {
        Err(HandlerError::NotFound("order".into()))
    }

    let mut builder = App::builder();
    builder
        .add_route(r"^/broken$", &[], broken)
        .unwrap()
        .add_route(r"^/explodes$", &[], explodes)
        .unwrap()
        .add_route(r"^/missing$", &[], missing)
        .unwrap();
    let app = builder.build();

    assert_eq!(send(&app, "GET", "/broken").await.status.code, 500);
    assert_eq!(send(&app, "GET", "/explodes").await.status.code, 500);
    assert_eq!(send(&app, "GET", "/missing").await.status.code, 404);
}

#[tokio::test]
async fn test_function_route_rejects_other_verbs() {
    async fn ping(_: Arc<App>, _: Arc<Message>, _: UrlArgs) -> HandlerResult {
        Ok(Response::new(Status::new(200, "OK"), "pong"))
    }

    let mut builder = App::builder();
    builder.add_route(r"^/ping$", &[Method::Get], ping).unwrap();
    let app = builder.build();

    assert_eq!(send(&app, "GET", "/ping").await.body_text(), "pong");
    let rejected = send(&app, "DELETE", "/ping").await;
    assert_eq!(rejected.status.code, 404);
    assert!(rejected.body.is_empty());
}

static GUARDED_RAN: AtomicBool = AtomicBool::new(false);

struct Guarded {
    cx: Context,
}

impl Guarded {
    fn get(&mut self, _args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            GUARDED_RAN.store(true, Ordering::SeqCst);
            Ok(self.cx.render())
        }
        .boxed()
    }
}

impl Handler for Guarded {
    fn context(&self) -> &Context {
        &self.cx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new().get(Guarded::get)
    }

    fn prepare(&mut self) -> HandlerFuture<'_, ()> {
        async move {
            self.cx.set_status_kind(StatusKind::AuthFailure);
            self.cx.finish();
            Ok(())
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_finished_prepare_skips_method() {
    let mut builder = App::builder();
    builder.add_handler(r"^/secret$", |cx| Guarded { cx }).unwrap();
    let app = builder.build();

    let response = send(&app, "GET", "/secret").await;
    assert_eq!(response.status.code, 401);
    assert!(!GUARDED_RAN.load(Ordering::SeqCst));
}

/// Members-only page; `web` picks the redirecting guard.
struct Members {
    cx: Context,
    web: bool,
}

impl Members {
    fn get(&mut self, _args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let user = self.cx.current_user().unwrap_or_default().to_string();
            self.cx.set_body(format!("Welcome, {user}"));
            Ok(self.cx.render())
        }
        .boxed()
    }
}

impl Handler for Members {
    fn context(&self) -> &Context {
        &self.cx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new().get(Members::get)
    }

    fn prepare(&mut self) -> HandlerFuture<'_, ()> {
        async move {
            if self.web {
                web_authenticated(&mut self.cx);
            } else {
                authenticated(&mut self.cx);
            }
            Ok(())
        }
        .boxed()
    }
}

fn members_app() -> Arc<App> {
    let mut builder = App::builder();
    builder
        .settings(AppSettings {
            cookie_secret: Some("s3cret".into()),
            login_url: Some("/login".into()),
            ..AppSettings::default()
        })
        .authenticator(CookieAuthenticator::new("user"))
        .add_handler(r"^/members$", |cx| Members { cx, web: false })
        .unwrap()
        .add_handler(r"^/account$", |cx| Members { cx, web: true })
        .unwrap();
    builder.build()
}

#[tokio::test]
async fn test_auth_guards_in_prepare() {
    let app = members_app();

    let rejected = send(&app, "GET", "/members").await;
    assert_eq!(rejected.status.code, 401);
    assert!(!rejected.body_text().contains("Welcome"));

    let redirected = send(&app, "GET", "/account").await;
    assert_eq!(redirected.status.code, 302);
    assert_eq!(redirected.header("location"), Some("/login"));

    let cookie = format!("user={}", signing::encode("user", "ada", "s3cret").unwrap());
    for path in ["/members", "/account"] {
        let response = app
            .handle(Message::builder("GET", path).header("cookie", cookie.as_str()).build())
            .await;
        assert_eq!(response.status.code, 200);
        assert_eq!(response.body_text(), "Welcome, ada");
    }
}

struct Teapot {
    cx: Context,
}

impl Handler for Teapot {
    fn context(&self) -> &Context {
        &self.cx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
    }

    fn unsupported(&mut self, _allowed: &[Method]) -> Response {
        self.cx.set_status_msg(418, "I'm a teapot");
        self.cx.render()
    }
}

#[tokio::test]
async fn test_custom_base_handler() {
    let mut builder = App::builder();
    builder.base_handler(|cx| Teapot { cx });
    let app = builder.build();

    let response = send(&app, "GET", "/anything").await;
    assert_eq!(response.status.code, 418);
    assert_eq!(response.status.msg, "I'm a teapot");
}
