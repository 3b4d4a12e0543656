//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files and
//! default every field, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::dispatch::AppSettings;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Which transport feeds the server loop.
    pub transport: TransportKind,

    /// Broker connection settings.
    pub broker: BrokerConfig,

    /// HTTP gateway settings.
    pub gateway: GatewayConfig,

    /// Concurrency limits.
    pub pool: PoolConfig,

    /// Settings exposed to handlers.
    pub application: ApplicationConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Transport selection.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Netstring-framed messages from a Mongrel2-style broker.
    Broker,
    /// Built-in HTTP listener.
    #[default]
    Gateway,
}

/// Broker endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Address requests are pulled from.
    pub pull_address: String,

    /// Address replies are published to.
    pub pub_address: String,

    /// Identity announced to the broker; random when unset.
    pub sender_id: Option<String>,

    /// Largest accepted frame.
    pub max_frame_bytes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            pull_address: "127.0.0.1:9999".to_string(),
            pub_address: "127.0.0.1:9998".to_string(),
            sender_id: None,
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

/// HTTP gateway listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "127.0.0.1:6767").
    pub bind_address: String,

    /// Per-request timeout.
    pub request_timeout_secs: u64,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:6767".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Task pool sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum messages handled concurrently.
    pub size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { size: 10_000 }
    }
}

/// Application settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub cookie_secret: Option<String>,
    pub login_url: Option<String>,
    pub api_base_url: String,
    /// Directory for the built-in template renderer.
    pub template_dir: Option<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            cookie_secret: None,
            login_url: None,
            api_base_url: "/".to_string(),
            template_dir: None,
        }
    }
}

impl ApplicationConfig {
    pub fn settings(&self) -> AppSettings {
        AppSettings {
            cookie_secret: self.cookie_secret.clone(),
            login_url: self.login_url.clone(),
            api_base_url: self.api_base_url.clone(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub log_filter: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "switchyard=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
