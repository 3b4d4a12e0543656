//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: `&AppConfig → Result<(), Vec<ValidationError>>`

use std::net::SocketAddr;

use crate::config::schema::{AppConfig, TransportKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("application.api_base_url must start with '/', got '{0}'")]
    ApiBaseUrl(String),

    #[error("application.cookie_secret must not be empty")]
    EmptySecret,
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.transport {
        TransportKind::Broker => {
            check_address(&mut errors, "broker.pull_address", &config.broker.pull_address);
            check_address(&mut errors, "broker.pub_address", &config.broker.pub_address);
            if config.broker.max_frame_bytes == 0 {
                errors.push(ValidationError::Zero {
                    field: "broker.max_frame_bytes",
                });
            }
        }
        TransportKind::Gateway => {
            check_address(&mut errors, "gateway.bind_address", &config.gateway.bind_address);
            if config.gateway.request_timeout_secs == 0 {
                errors.push(ValidationError::Zero {
                    field: "gateway.request_timeout_secs",
                });
            }
        }
    }

    if config.pool.size == 0 {
        errors.push(ValidationError::Zero { field: "pool.size" });
    }
    if !config.application.api_base_url.starts_with('/') {
        errors.push(ValidationError::ApiBaseUrl(config.application.api_base_url.clone()));
    }
    if config.application.cookie_secret.as_deref() == Some("") {
        errors.push(ValidationError::EmptySecret);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.gateway.bind_address = "nowhere".into();
        config.pool.size = 0;
        config.application.api_base_url = "api".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero { field: "pool.size" }));
    }

    #[test]
    fn test_broker_addresses_checked_only_for_broker() {
        let mut config = AppConfig::default();
        config.broker.pull_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.transport = TransportKind::Broker;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidAddress { field: "broker.pull_address", .. }
        ));
    }
}
