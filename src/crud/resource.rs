//! JSON REST handler over a [`Queryset`].
//!
//! # Data Flow
//! ```text
//! GET    /{name}/           → read_all
//! GET    /{name}/a,b        → read_many
//! POST   /{name}/   + body  → create (item or list)
//! POST   /{name}/a  + body  → update, ids must match the body
//! PUT    /{name}/a,b + body → update, ids must match the body
//! DELETE /{name}/a,b        → destroy
//! ```
//!
//! One item renders its status directly. A batch renders `data` as a list;
//! when its items disagree the response is 207 with a `multistatus` list.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{json, Value};

use crate::crud::queryset::{item_id, CrudOutcome, CrudStatus, OneOrMany, Queryset};
use crate::handler::{
    Context, Flavor, Handler, HandlerError, HandlerFuture, MethodTable, StatusKind,
};
use crate::message::Response;
use crate::routing::UrlArgs;

/// Separator between ids in a resource URL.
pub const ID_SEPARATOR: char = ',';

/// Route pattern for a resource mounted at `prefix`.
pub fn resource_pattern(prefix: &str) -> String {
    format!(r"{}/((?P<ids>[-\w\d{}]+)(/)*|$)", prefix, ID_SEPARATOR)
}

/// Maps a set of per-item tokens to a response status.
pub fn aggregate_status(statuses: &[CrudStatus]) -> StatusKind {
    let kinds: BTreeSet<CrudStatus> = statuses.iter().copied().collect();
    if kinds.len() > 1 {
        return StatusKind::MultiStatus;
    }
    match kinds.into_iter().next() {
        Some(CrudStatus::Failed) => StatusKind::BadRequest,
        Some(CrudStatus::Created) => StatusKind::Created,
        Some(CrudStatus::NotFound) => StatusKind::NotFound,
        Some(CrudStatus::Updated) | Some(CrudStatus::Ok) | None => StatusKind::Ok,
    }
}

/// The per-request REST handler for one registered queryset.
pub struct Resource<Q: Queryset> {
    cx: Context,
    queries: Arc<Q>,
    prefix: Arc<str>,
}

impl<Q: Queryset> Resource<Q> {
    pub fn new(cx: Context, queries: Arc<Q>, prefix: Arc<str>) -> Self {
        Self { cx, queries, prefix }
    }

    fn get(&mut self, args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let ids = parse_ids(&args);
            let outcome = self.queries.read(ids).await?;
            Ok(self.respond(outcome))
        }
        .boxed()
    }

    fn post(&mut self, args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let body = self.body_data()?;
            match parse_ids(&args) {
                None => {
                    let outcome = self.queries.create(body).await?;
                    Ok(self.respond(outcome))
                }
                Some(ids) => {
                    ensure_ids_match(&ids, &body)?;
                    let outcome = self.queries.update(body).await?;
                    Ok(self.respond(outcome))
                }
            }
        }
        .boxed()
    }

    fn put(&mut self, args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let ids = parse_ids(&args)
                .ok_or_else(|| HandlerError::BadRequest("PUT requires item ids".into()))?;
            let body = self.body_data()?;
            ensure_ids_match(&ids, &body)?;
            let outcome = self.queries.update(body).await?;
            Ok(self.respond(outcome))
        }
        .boxed()
    }

    fn delete(&mut self, args: UrlArgs) -> HandlerFuture<'_, Response> {
        async move {
            let ids = parse_ids(&args)
                .ok_or_else(|| HandlerError::BadRequest("DELETE requires item ids".into()))?;
            let outcome = self.queries.destroy(ids).await?;
            Ok(self.respond(outcome))
        }
        .boxed()
    }

    /// The request body as JSON: the raw body for `application/json`,
    /// otherwise the `data` argument.
    fn body_data(&self) -> Result<OneOrMany<Value>, HandlerError> {
        let message = self.cx.message();
        let is_json = message
            .content_type()
            .is_some_and(|ct| ct.starts_with("application/json"));
        let raw = if is_json {
            message.body().to_vec()
        } else {
            self.cx.get_argument("data").unwrap_or_default().into_bytes()
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(HandlerError::BadRequest("request has no data".into()));
        }

        match serde_json::from_slice::<Value>(&raw)? {
            Value::Array(items) if items.iter().all(Value::is_object) => Ok(OneOrMany::Many(items)),
            item @ Value::Object(_) => Ok(OneOrMany::One(item)),
            _ => Err(HandlerError::BadRequest("data must be an object or a list of objects".into())),
        }
    }

    fn respond(&mut self, outcome: OneOrMany<CrudOutcome>) -> Response {
        match outcome {
            OneOrMany::One((status, datum)) => {
                self.cx.add_to_payload("data", datum);
                self.cx.set_status_kind(aggregate_status(&[status]));
            }
            OneOrMany::Many(outcomes) => {
                let statuses: Vec<CrudStatus> = outcomes.iter().map(|(s, _)| *s).collect();
                let kind = aggregate_status(&statuses);
                if kind == StatusKind::MultiStatus {
                    let multistatus: Vec<Value> = outcomes
                        .iter()
                        .map(|(status, datum)| {
                            let id = datum_id(datum);
                            json!({
                                "status": status,
                                "id": id,
                                "href": format!("{}/{}", self.prefix, id),
                            })
                        })
                        .collect();
                    self.cx.add_to_payload("multistatus", multistatus);
                }
                let data: Vec<Value> = outcomes.into_iter().map(|(_, datum)| datum).collect();
                self.cx.add_to_payload("data", data);
                self.cx.set_status_kind(kind);
            }
        }
        self.cx.render()
    }
}

impl<Q: Queryset> Handler for Resource<Q> {
    const FLAVOR: Flavor = Flavor::Json;

    fn context(&self) -> &Context {
        &self.cx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    fn methods() -> MethodTable<Self> {
        MethodTable::new()
            .get(Self::get)
            .post(Self::post)
            .put(Self::put)
            .delete(Self::delete)
    }
}

fn parse_ids(args: &UrlArgs) -> Option<OneOrMany<String>> {
    let ids: Vec<String> = args
        .get("ids")?
        .split(ID_SEPARATOR)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    match ids.len() {
        0 => None,
        1 => ids.into_iter().next().map(OneOrMany::One),
        _ => Some(OneOrMany::Many(ids)),
    }
}

/// The ids in the URL must name exactly the items in the body, in order.
fn ensure_ids_match(ids: &OneOrMany<String>, body: &OneOrMany<Value>) -> Result<(), HandlerError> {
    let matches = match (ids, body) {
        (OneOrMany::One(id), OneOrMany::One(item)) => item_id(item).as_deref() == Some(id.as_str()),
        (OneOrMany::Many(ids), OneOrMany::Many(items)) => {
            ids.len() == items.len()
                && ids
                    .iter()
                    .zip(items)
                    .all(|(id, item)| item_id(item).as_deref() == Some(id.as_str()))
        }
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(HandlerError::BadRequest("URL ids do not match the body".into()))
    }
}

fn datum_id(datum: &Value) -> String {
    match datum {
        Value::String(id) => id.clone(),
        other => item_id(other).unwrap_or_default(),
    }
}
