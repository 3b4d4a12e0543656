//! Errors raised by handler code.

use std::any::Any;

use axum::http::header::InvalidHeaderValue;

use crate::crud::CrudError;
use crate::handler::status::StatusKind;
use crate::handler::template::TemplateError;
use crate::security::SigningError;

/// Any failure inside a handler hook or method.
///
/// These never leave the lifecycle engine: they are handed to the handler's
/// `error` hook and rendered.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("authentication required")]
    AuthFailure,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("no cookie secret configured")]
    NoCookieSecret,

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Crud(#[from] CrudError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn other(msg: impl Into<String>) -> Self {
        HandlerError::Other(msg.into())
    }

    /// Build from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        HandlerError::Panicked(msg)
    }

    /// The status the default `error` hook renders for this error.
    pub fn status_kind(&self) -> StatusKind {
        match self {
            HandlerError::BadRequest(_)
            | HandlerError::MissingArgument(_)
            | HandlerError::Json(_) => StatusKind::BadRequest,
            HandlerError::AuthFailure => StatusKind::AuthFailure,
            HandlerError::NotFound(_) => StatusKind::NotFound,
            HandlerError::Crud(CrudError::NotFound(_)) => StatusKind::NotFound,
            HandlerError::Crud(CrudError::Invalid(_)) => StatusKind::BadRequest,
            _ => StatusKind::ServerError,
        }
    }
}
