//! The handler used when no route matches.

use crate::handler::context::Context;
use crate::handler::lifecycle::Handler;
use crate::handler::methods::MethodTable;
use crate::handler::status::StatusKind;
use crate::message::{Method, Response};

/// Implements no verbs; every request renders not-found.
#[derive(Debug)]
pub struct DefaultHandler {
    cx: Context,
}

impl DefaultHandler {
    pub fn new(cx: Context) -> Self {
        Self { cx }
    }
}

impl Handler for DefaultHandler {
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
        self.cx.render_error(StatusKind::NotFound)
    }
}
