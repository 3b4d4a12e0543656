//! The application: route table, capabilities and shared resources.

use std::future::Future;
use std::sync::Arc;

use axum::http::Extensions;

use crate::crud::{resource_pattern, Queryset, Resource};
use crate::dispatch::descriptor::{factory_for, Descriptor, Factory, Invocable};
use crate::handler::{
    Context, DefaultHandler, Handler, HandlerResult, Lifecycle, TemplateRenderer,
};
use crate::message::{Message, Method, Response};
use crate::routing::{RouteError, RouteTable, UrlArgs};
use crate::security::Authenticator;

/// Application-wide settings handlers can read.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Secret for signed cookies.
    pub cookie_secret: Option<String>,
    /// Where `web_authenticated` sends anonymous users.
    pub login_url: Option<String>,
    /// Prefix for `register_api` routes.
    pub api_base_url: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cookie_secret: None,
            login_url: None,
            api_base_url: "/".to_string(),
        }
    }
}

/// Immutable once built; shared by every in-flight request.
pub struct App {
    routes: RouteTable<Descriptor>,
    base: Factory,
    settings: AppSettings,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    extensions: Extensions,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn routes(&self) -> &RouteTable<Descriptor> {
        &self.routes
    }

    pub fn renderer(&self) -> Option<&dyn TemplateRenderer> {
        self.renderer.as_deref()
    }

    pub fn authenticator(&self) -> Option<&dyn Authenticator> {
        self.authenticator.as_deref()
    }

    /// A shared resource registered with [`AppBuilder::extension`].
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Pick what handles `message`.
    ///
    /// A miss goes to the base handler.
    pub fn route_message(self: &Arc<Self>, message: Arc<Message>) -> Invocable {
        match self.routes.match_path(message.path()) {
            Some((Descriptor::Class(factory), args)) => {
                Invocable::Handler(factory(self.clone(), message, args))
            }
            Some((Descriptor::Function(fun), args)) => Invocable::Function {
                fun: fun.clone(),
                app: self.clone(),
                message,
                args,
            },
            None => {
                tracing::debug!(
                    request_id = %message.id(),
                    path = %message.path(),
                    "No route matched, using base handler"
                );
                Invocable::Handler(self.base_instance(message))
            }
        }
    }

    /// Route and run `message`.
    pub async fn handle(self: &Arc<Self>, message: Message) -> Response {
        self.route_message(Arc::new(message)).invoke().await
    }

    pub(crate) fn base_instance(self: &Arc<Self>, message: Arc<Message>) -> Box<dyn Lifecycle> {
        (self.base)(self.clone(), message, UrlArgs::Empty)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.routes.len())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Collects routes and capabilities, then freezes them into an [`App`].
pub struct AppBuilder {
    routes: RouteTable<Descriptor>,
    base: Option<Factory>,
    settings: AppSettings,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    extensions: Extensions,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self {
            routes: RouteTable::new(),
            base: None,
            settings: AppSettings::default(),
            renderer: None,
            authenticator: None,
            extensions: Extensions::new(),
        }
    }
}

impl AppBuilder {
    pub fn settings(&mut self, settings: AppSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub fn renderer(&mut self, renderer: impl TemplateRenderer + 'static) -> &mut Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn authenticator(&mut self, authenticator: impl Authenticator + 'static) -> &mut Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Register a shared resource, reachable from every handler by type.
    pub fn extension<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.extensions.insert(value);
        self
    }

    /// Replace the handler used when no route matches.
    pub fn base_handler<H, F>(&mut self, factory: F) -> &mut Self
    where
        H: Handler,
        F: Fn(Context) -> H + Send + Sync + 'static,
    {
        self.base = Some(factory_for(factory));
        self
    }

    /// Append a route. Earlier routes win.
    pub fn add_route_rule(&mut self, pattern: &str, descriptor: Descriptor) -> Result<&mut Self, RouteError> {
        self.routes.add_rule(pattern, descriptor)?;
        Ok(self)
    }

    /// Route `pattern` to handler type `H`.
    pub fn add_handler<H, F>(&mut self, pattern: &str, factory: F) -> Result<&mut Self, RouteError>
    where
        H: Handler,
        F: Fn(Context) -> H + Send + Sync + 'static,
    {
        self.add_route_rule(pattern, Descriptor::class(factory))
    }

    /// Route `pattern` to a function that only accepts `methods`.
    ///
    /// Other verbs render the base handler's unsupported response without
    /// calling `fun`. An empty list accepts every verb.
    pub fn add_route<F, Fut>(&mut self, pattern: &str, methods: &[Method], fun: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(Arc<App>, Arc<Message>, UrlArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let allowed: Arc<[Method]> = methods.into();
        let fun = Arc::new(fun);
        let descriptor = Descriptor::function(move |app: Arc<App>, message: Arc<Message>, args: UrlArgs| {
            let allowed = allowed.clone();
            let fun = fun.clone();
            async move {
                let permitted = allowed.is_empty()
                    || message.method().is_some_and(|m| allowed.contains(&m));
                if !permitted {
                    return Ok(app.base_instance(message).unsupported());
                }
                fun(app, message, args).await
            }
        });
        self.add_route_rule(pattern, descriptor)
    }

    /// Expose `queryset` as a JSON REST resource under
    /// `{api_base_url}{name}/`.
    pub fn register_api<Q: Queryset>(&mut self, name: &str, queryset: Q) -> Result<&mut Self, RouteError> {
        let prefix: Arc<str> = format!("{}{}", self.settings.api_base_url, name).into();
        let pattern = resource_pattern(&prefix);
        let queries = Arc::new(queryset);
        tracing::info!(resource = %name, prefix = %prefix, "Registering API");
        self.add_handler(&pattern, move |cx| {
            Resource::new(cx, queries.clone(), prefix.clone())
        })
    }

    pub fn build(self) -> Arc<App> {
        let base = self.base.unwrap_or_else(|| factory_for(DefaultHandler::new));
        tracing::debug!(routes = self.routes.len(), "Application built");
        Arc::new(App {
            routes: self.routes,
            base,
            settings: self.settings,
            renderer: self.renderer,
            authenticator: self.authenticator,
            extensions: self.extensions,
        })
    }
}
