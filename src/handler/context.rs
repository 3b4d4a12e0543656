//! Per-request handler state.
//!
//! # Responsibilities
//! - Own the message, captured URL arguments and the payload being built
//! - Track whether a response has been produced (`finished`)
//! - Render the payload according to the handler's flavor
//!
//! # Design Decisions
//! - Status starts at the flavor's server error; handlers earn success
//! - `clear_payload` keeps the current status
//! - Rendering always marks the context finished

use std::sync::Arc;

use axum::http::header::{self, HeaderName, HeaderValue};
use bytes::Bytes;
use serde_json::Value;

use crate::dispatch::App;
use crate::handler::error::HandlerError;
use crate::handler::payload::Payload;
use crate::handler::status::{Flavor, StatusKind};
use crate::handler::template::TemplateError;
use crate::message::{Cookie, CookieJar, Message, Response, Status};
use crate::routing::UrlArgs;
use crate::security::signing;

/// Rendering switches for JSON handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render only the payload's `data` entry when present.
    pub hide_status: bool,
    /// Send HTTP 200 regardless of the payload status.
    pub http_200: bool,
}

/// Everything a handler instance knows about its request.
pub struct Context {
    app: Arc<App>,
    message: Arc<Message>,
    flavor: Flavor,
    url_args: UrlArgs,
    payload: Payload,
    cookies: CookieJar,
    options: RenderOptions,
    finished: bool,
    current_user: Option<Option<String>>,
}

impl Context {
    pub fn new(app: Arc<App>, message: Arc<Message>, flavor: Flavor) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Self {
            app,
            message,
            flavor,
            url_args: UrlArgs::Empty,
            payload: Payload::new(flavor.default_status(), timestamp),
            cookies: CookieJar::default(),
            options: RenderOptions::default(),
            finished: false,
            current_user: None,
        }
    }

    pub fn with_url_args(mut self, url_args: UrlArgs) -> Self {
        self.url_args = url_args;
        self
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub(crate) fn message_arc(&self) -> Arc<Message> {
        self.message.clone()
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn url_args(&self) -> &UrlArgs {
        &self.url_args
    }

    /// Shared resource registered on the application.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.app.extension::<T>()
    }

    // Status

    pub fn status(&self) -> &Status {
        &self.payload.status
    }

    /// Set a status code; the message comes from the flavor's table.
    pub fn set_status(&mut self, code: i32) {
        self.payload.status = self.flavor.lookup(code);
    }

    pub fn set_status_kind(&mut self, kind: StatusKind) {
        self.payload.status = self.flavor.status(kind);
    }

    pub fn set_status_msg(&mut self, code: i32, msg: impl Into<String>) {
        self.payload.status = Status::with_msg(code, msg);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    // Payload

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn add_to_payload(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.payload.data.insert(key.into(), value.into());
    }

    /// Reset body, headers and data, keeping the current status.
    pub fn clear_payload(&mut self) {
        self.payload.clear();
    }

    /// Set the body and mark the request successful.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.payload.body = body.into();
        self.set_status_kind(StatusKind::Ok);
    }

    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), HandlerError> {
        self.payload.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(())
    }

    pub fn render_options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    // Arguments

    /// Last value of `name`, control characters blanked and trimmed.
    pub fn get_argument(&self, name: &str) -> Option<String> {
        self.message.get_argument(name, true)
    }

    pub fn get_arguments(&self, name: &str) -> Vec<String> {
        self.message.get_arguments(name, true).unwrap_or_default()
    }

    pub fn require_argument(&self, name: &str) -> Result<String, HandlerError> {
        self.get_argument(name)
            .ok_or_else(|| HandlerError::MissingArgument(name.to_string()))
    }

    // Cookies

    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.message.cookie(name)
    }

    /// Value of a signed cookie; `None` if missing, unsigned or tampered.
    pub fn get_signed_cookie(&self, name: &str) -> Option<String> {
        let secret = self.app.settings().cookie_secret.as_deref()?;
        let raw = self.message.cookie(name)?;
        signing::decode(raw, secret)
            .filter(|(cookie_name, _)| cookie_name == name)
            .map(|(_, value)| value)
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.set(cookie);
    }

    /// Queue `cookie` with its value signed by the application secret.
    pub fn set_signed_cookie(&mut self, mut cookie: Cookie) -> Result<(), HandlerError> {
        let secret = self
            .app
            .settings()
            .cookie_secret
            .as_deref()
            .ok_or(HandlerError::NoCookieSecret)?;
        cookie.value = signing::encode(&cookie.name, &cookie.value, secret)?;
        self.cookies.set(cookie);
        Ok(())
    }

    pub fn delete_cookie(&mut self, name: &str) {
        self.cookies.set(Cookie::new(name, "").max_age(-1).expires("0"));
    }

    /// Expire every cookie the client sent.
    pub fn delete_cookies(&mut self) {
        let names: Vec<String> = self.message.cookies().keys().cloned().collect();
        for name in names {
            self.delete_cookie(&name);
        }
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    // Authentication

    /// The authenticated user, resolved once through the app's authenticator.
    pub fn current_user(&mut self) -> Option<&str> {
        if self.current_user.is_none() {
            let user = self
                .app
                .authenticator()
                .and_then(|auth| auth.current_user(&self.message, &self.app));
            self.current_user = Some(user);
        }
        self.current_user.as_ref().and_then(|u| u.as_deref())
    }

    // Rendering

    /// Render the payload and mark the context finished.
    pub fn render(&mut self) -> Response {
        self.finished = true;

        let response = match self.flavor {
            Flavor::Message => Response::new(
                self.payload.status.clone(),
                self.payload.to_json().to_string(),
            )
            .raw(),
            Flavor::Web => {
                let mut response = Response::new(self.payload.status.clone(), self.payload.body.clone())
                    .with_headers(self.payload.headers.clone());
                self.append_cookies(&mut response);
                response
            }
            Flavor::Json => {
                let body = match self.payload.data.get("data") {
                    Some(data) if self.options.hide_status => data.to_string(),
                    _ => self.payload.to_json().to_string(),
                };
                let status = if self.options.http_200 {
                    self.flavor.status(StatusKind::Ok)
                } else {
                    self.payload.status.clone()
                };
                let mut response = Response::new(status, body).with_headers(self.payload.headers.clone());
                response.headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                self.append_cookies(&mut response);
                response
            }
        };

        tracing::info!(
            request_id = %self.message.id(),
            status = response.status.code,
            method = %self.message.verb(),
            path = %self.message.path(),
            remote = %self.message.remote_addr().unwrap_or("-"),
            "Rendered response"
        );
        response
    }

    /// Clear the payload and render `kind`.
    pub fn render_error(&mut self, kind: StatusKind) -> Response {
        self.render_error_with(kind, |_| {})
    }

    /// Like [`render_error`](Self::render_error) with a customization step
    /// run after the payload is cleared.
    pub fn render_error_with(&mut self, kind: StatusKind, customize: impl FnOnce(&mut Self)) -> Response {
        self.clear_payload();
        self.set_status_kind(kind);
        customize(self);
        self.render()
    }

    /// Render a 302 to `url`.
    pub fn redirect(&mut self, url: &str) -> Result<Response, HandlerError> {
        self.set_redirect(url)?;
        Ok(self.render())
    }

    /// Prepare a redirect to `url` and finish the request without rendering.
    pub fn set_redirect(&mut self, url: &str) -> Result<(), HandlerError> {
        let location = HeaderValue::from_str(url)?;
        tracing::debug!(request_id = %self.message.id(), url, "Redirecting");
        self.clear_payload();
        let code = self.flavor.code(StatusKind::Found);
        self.set_status_msg(code, format!("Page has moved to {url}"));
        self.payload.headers.insert(header::LOCATION, location);
        self.finish();
        Ok(())
    }

    /// Render a named template through the app's renderer and set it as body.
    pub fn render_template(&mut self, name: &str, context: &Value) -> Result<Response, HandlerError> {
        let renderer = self.app.renderer().ok_or(TemplateError::NoRenderer)?;
        let body = renderer.render(name, context)?;
        self.set_body(body);
        if !self.payload.headers.contains_key(header::CONTENT_TYPE) {
            self.payload
                .headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        }
        Ok(self.render())
    }

    fn append_cookies(&self, response: &mut Response) {
        for value in self.cookies.header_values() {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    response.headers.append(header::SET_COOKIE, value);
                }
                Err(_) => tracing::warn!(cookie = %value, "Dropping unrepresentable cookie"),
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("message", &self.message.id())
            .field("flavor", &self.flavor)
            .field("status", &self.payload.status)
            .field("finished", &self.finished)
            .finish()
    }
}
