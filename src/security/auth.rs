//! Authentication capability and guards.
//!
//! The application owns an optional [`Authenticator`]; handlers ask for the
//! current user through [`Context::current_user`] and gate their methods
//! with [`authenticated`] or [`web_authenticated`].

use crate::dispatch::App;
use crate::handler::{Context, StatusKind};
use crate::message::Message;
use crate::security::signing;

/// Resolves the user behind a message.
pub trait Authenticator: Send + Sync {
    fn current_user(&self, message: &Message, app: &App) -> Option<String>;
}

/// Reads the user id from a signed cookie.
#[derive(Debug, Clone)]
pub struct CookieAuthenticator {
    cookie_name: String,
}

impl CookieAuthenticator {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

impl Authenticator for CookieAuthenticator {
    fn current_user(&self, message: &Message, app: &App) -> Option<String> {
        let secret = app.settings().cookie_secret.as_deref()?;
        let raw = message.cookie(&self.cookie_name)?;
        signing::decode(raw, secret)
            .filter(|(name, _)| *name == self.cookie_name)
            .map(|(_, user)| user)
    }
}

/// Lets the request through when a user is present.
///
/// Otherwise sets an authentication failure, finishes the request and
/// returns `false`; the lifecycle renders it once the current step returns.
/// Meant for `prepare()`:
///
/// ```ignore
/// fn prepare(&mut self) -> HandlerFuture<'_, ()> {
///     Box::pin(async move {
///         authenticated(&mut self.cx);
///         Ok(())
///     })
/// }
/// ```
pub fn authenticated(cx: &mut Context) -> bool {
    if cx.current_user().is_some() {
        return true;
    }
    cx.clear_payload();
    cx.set_status_kind(StatusKind::AuthFailure);
    cx.finish();
    false
}

/// Like [`authenticated`], but anonymous users are redirected to the
/// application's login URL.
///
/// Without a usable login URL the request finishes as a server error.
pub fn web_authenticated(cx: &mut Context) -> bool {
    if cx.current_user().is_some() {
        return true;
    }
    let Some(login_url) = cx.app().settings().login_url.clone() else {
        tracing::error!("web_authenticated used without a configured login_url");
        fail(cx);
        return false;
    };
    if let Err(err) = cx.set_redirect(&login_url) {
        tracing::error!(error = %err, "Invalid login_url");
        fail(cx);
    }
    false
}

fn fail(cx: &mut Context) {
    cx.clear_payload();
    cx.set_status_kind(StatusKind::ServerError);
    cx.finish();
}
