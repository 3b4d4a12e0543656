//! switchyard server binary.
//!
//! Loads the configuration, builds a small demonstration application and
//! serves it over the configured transport until Ctrl-C.
//!
//! ```text
//! switchyard --config switchyard.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures_util::FutureExt;

use switchyard::config::{load_config, AppConfig, TransportKind};
use switchyard::crud::MemoryQueryset;
use switchyard::handler::{Context, DirectoryTemplates, Handler, HandlerFuture, MethodTable};
use switchyard::message::{Message, Method, Response, Status};
use switchyard::observability::{init_logging, init_metrics};
use switchyard::routing::UrlArgs;
use switchyard::security::CookieAuthenticator;
use switchyard::server::{shutdown_on_ctrl_c, Server, ServerError, Shutdown, TaskPool, Transport};
use switchyard::transport::{BrokerTransport, Gateway};
use switchyard::{App, HandlerResult};

#[derive(Parser, Debug)]
#[command(name = "switchyard", version, about = "Message routing and handler lifecycle server")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// `GET /hello/<name>` and `GET /hello?name=...`
struct Greet {
    cx: Context,
}

impl Greet {
    fn get(&mut self, args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let name = args
                .get("name")
                .map(str::to_string)
                .or_else(|| self.cx.get_argument("name"))
                .unwrap_or_else(|| "world".to_string());
            let user = self.cx.current_user().map(str::to_string);
            let body = match user {
                Some(user) => format!("Hello, {name}! (signed in as {user})"),
                None => format!("Hello, {name}!"),
            };
            self.cx.set_body(body);
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

async fn ping(_app: Arc<App>, _message: Arc<Message>, _args: UrlArgs) -> HandlerResult {
    Ok(Response::new(Status::new(200, "OK"), "pong"))
}

fn build_app(config: &AppConfig) -> Result<Arc<App>, Box<dyn std::error::Error>> {
    let application = &config.application;
    let mut builder = App::builder();
    builder.settings(application.settings());

    if let Some(dir) = &application.template_dir {
        builder.renderer(DirectoryTemplates::load(dir)?);
    }
    if application.cookie_secret.is_some() {
        builder.authenticator(CookieAuthenticator::new("user"));
    }

    builder
        .add_handler(r"/hello/(?P<name>\w+)$", |cx| Greet { cx })?
        .add_handler(r"/hello/?$", |cx| Greet { cx })?
        .add_route(r"/ping$", &[Method::Get, Method::Head], ping)?
        .register_api("todos", MemoryQueryset::new())?;

    Ok(builder.build())
}

async fn serve<T: Transport>(
    app: Arc<App>,
    transport: T,
    pool_size: usize,
    shutdown: Shutdown,
) -> Result<(), ServerError> {
    Server::new(app, transport, TaskPool::new(pool_size))
        .with_shutdown(shutdown)
        .run()
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    init_logging(&config.observability.log_filter)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?config.transport,
        pool_size = config.pool.size,
        "switchyard starting"
    );

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let app = build_app(&config)?;
    tracing::info!(routes = app.routes().len(), "Application ready");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

    match config.transport {
        TransportKind::Broker => {
            let transport = BrokerTransport::connect(&config.broker).await?;
            serve(app, transport, config.pool.size, shutdown).await?;
        }
        TransportKind::Gateway => {
            let transport = Gateway::bind(&config.gateway, shutdown.clone()).await?;
            serve(app, transport, config.pool.size, shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
