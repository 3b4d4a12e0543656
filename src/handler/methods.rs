//! Verb → handler method lookup, built once per handler type.

use futures_util::future::BoxFuture;

use crate::handler::error::HandlerError;
use crate::message::{Method, Response};
use crate::routing::UrlArgs;

/// What every handler method produces.
pub type HandlerResult = Result<Response, HandlerError>;

/// Boxed future returned by handler hooks and methods.
pub type HandlerFuture<'a, T> = BoxFuture<'a, Result<T, HandlerError>>;

/// A handler method: borrows the handler for the duration of the call.
pub type MethodFn<H> = for<'a> fn(&'a mut H, UrlArgs) -> HandlerFuture<'a, Response>;

/// The verbs a handler implements.
///
/// ```ignore
/// MethodTable::new().get(Greet::get).post(Greet::post)
/// ```
pub struct MethodTable<H> {
    entries: Vec<(Method, MethodFn<H>)>,
}

impl<H> MethodTable<H> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Bind `method`, replacing an earlier binding.
    pub fn on(mut self, method: Method, fun: MethodFn<H>) -> Self {
        match self.entries.iter_mut().find(|(m, _)| *m == method) {
            Some(entry) => entry.1 = fun,
            None => self.entries.push((method, fun)),
        }
        self
    }

    pub fn get(self, fun: MethodFn<H>) -> Self {
        self.on(Method::Get, fun)
    }

    pub fn post(self, fun: MethodFn<H>) -> Self {
        self.on(Method::Post, fun)
    }

    pub fn put(self, fun: MethodFn<H>) -> Self {
        self.on(Method::Put, fun)
    }

    pub fn delete(self, fun: MethodFn<H>) -> Self {
        self.on(Method::Delete, fun)
    }

    pub fn head(self, fun: MethodFn<H>) -> Self {
        self.on(Method::Head, fun)
    }

    pub fn options(self, fun: MethodFn<H>) -> Self {
        self.on(Method::Options, fun)
    }

    pub fn lookup(&self, method: Method) -> Option<MethodFn<H>> {
        self.entries.iter().find(|(m, _)| *m == method).map(|(_, f)| *f)
    }

    /// Implemented verbs in canonical order.
    pub fn allowed(&self) -> Vec<Method> {
        Method::ALL
            .iter()
            .copied()
            .filter(|m| self.entries.iter().any(|(bound, _)| bound == m))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H> Default for MethodTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> std::fmt::Debug for MethodTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.allowed()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Status;
    use futures_util::FutureExt;

    struct Probe;

    impl Probe {
        fn get(&mut self, _args: UrlArgs) -> HandlerFuture<'_, Response> {
            async { Ok(Response::new(Status::new(200, "OK"), "get")) }.boxed()
        }

        fn post(&mut self, _args: UrlArgs) -> HandlerFuture<'_, Response> {
            async { Ok(Response::new(Status::new(200, "OK"), "post")) }.boxed()
        }
    }

    #[test]
    fn test_allowed_in_canonical_order() {
        let table = MethodTable::<Probe>::new().post(Probe::post).get(Probe::get);
        assert_eq!(table.allowed(), vec![Method::Get, Method::Post]);
        assert!(table.lookup(Method::Delete).is_none());
    }

    #[tokio::test]
    async fn test_rebinding_replaces() {
        let table = MethodTable::<Probe>::new().get(Probe::get).on(Method::Get, Probe::post);
        let fun = table.lookup(Method::Get).unwrap();
        let response = fun(&mut Probe, UrlArgs::Empty).await.unwrap();
        assert_eq!(response.body_text(), "post");
        assert_eq!(table.allowed().len(), 1);
    }
}
