//! The storage contract behind the REST surface.
//!
//! Every operation works on one item or a batch and reports a
//! [`CrudStatus`] per item, so a batch can partially succeed.

use std::fmt;
use std::future::Future;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Outcome token of one CRUD operation on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrudStatus {
    Ok,
    Created,
    Updated,
    NotFound,
    Failed,
}

impl CrudStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudStatus::Ok => "OK",
            CrudStatus::Created => "Created",
            CrudStatus::Updated => "Updated",
            CrudStatus::NotFound => "Not Found",
            CrudStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for CrudStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CrudStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    #[error("item '{0}' not found")]
    NotFound(String),

    #[error("invalid item: {0}")]
    Invalid(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// A status token paired with the item (or id) it refers to.
pub type CrudOutcome = (CrudStatus, Value);

/// A single value or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// The `id` of a stored item, as text.
pub fn item_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Key-value storage of JSON items addressed by their `id` field.
///
/// Implement the `*_one` operations and `read_all`; batch operations
/// default to calling the single-item version per element.
pub trait Queryset: Send + Sync + 'static {
    fn create_one(&self, item: Value) -> impl Future<Output = Result<CrudOutcome, CrudError>> + Send;

    fn read_all(&self) -> impl Future<Output = Result<Vec<CrudOutcome>, CrudError>> + Send;

    fn read_one(&self, id: &str) -> impl Future<Output = Result<CrudOutcome, CrudError>> + Send;

    fn update_one(&self, item: Value) -> impl Future<Output = Result<CrudOutcome, CrudError>> + Send;

    /// Remove an item. An unknown id is [`CrudError::NotFound`].
    fn destroy_one(&self, id: &str) -> impl Future<Output = Result<CrudOutcome, CrudError>> + Send;

    fn create_many(
        &self,
        items: Vec<Value>,
    ) -> impl Future<Output = Result<Vec<CrudOutcome>, CrudError>> + Send {
        async move {
            let mut outcomes = Vec::with_capacity(items.len());
            for item in items {
                outcomes.push(self.create_one(item).await?);
            }
            Ok(outcomes)
        }
    }

    fn read_many(&self, ids: &[String]) -> impl Future<Output = Result<Vec<CrudOutcome>, CrudError>> + Send {
        async move {
            let mut outcomes = Vec::with_capacity(ids.len());
            for id in ids {
                outcomes.push(self.read_one(id).await?);
            }
            Ok(outcomes)
        }
    }

    fn update_many(
        &self,
        items: Vec<Value>,
    ) -> impl Future<Output = Result<Vec<CrudOutcome>, CrudError>> + Send {
        async move {
            let mut outcomes = Vec::with_capacity(items.len());
            for item in items {
                outcomes.push(self.update_one(item).await?);
            }
            Ok(outcomes)
        }
    }

    fn destroy_many(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<Vec<CrudOutcome>, CrudError>> + Send {
        async move {
            let mut outcomes = Vec::with_capacity(ids.len());
            for id in ids {
                outcomes.push(self.destroy_one(id).await?);
            }
            Ok(outcomes)
        }
    }

    fn create(
        &self,
        items: OneOrMany<Value>,
    ) -> impl Future<Output = Result<OneOrMany<CrudOutcome>, CrudError>> + Send {
        async move {
            Ok(match items {
                OneOrMany::One(item) => OneOrMany::One(self.create_one(item).await?),
                OneOrMany::Many(items) => OneOrMany::Many(self.create_many(items).await?),
            })
        }
    }

    /// No ids reads everything.
    fn read(
        &self,
        ids: Option<OneOrMany<String>>,
    ) -> impl Future<Output = Result<OneOrMany<CrudOutcome>, CrudError>> + Send {
        async move {
            Ok(match ids {
                None => OneOrMany::Many(self.read_all().await?),
                Some(OneOrMany::One(id)) => OneOrMany::One(self.read_one(&id).await?),
                Some(OneOrMany::Many(ids)) => OneOrMany::Many(self.read_many(&ids).await?),
            })
        }
    }

    fn update(
        &self,
        items: OneOrMany<Value>,
    ) -> impl Future<Output = Result<OneOrMany<CrudOutcome>, CrudError>> + Send {
        async move {
            Ok(match items {
                OneOrMany::One(item) => OneOrMany::One(self.update_one(item).await?),
                OneOrMany::Many(items) => OneOrMany::Many(self.update_many(items).await?),
            })
        }
    }

    fn destroy(
        &self,
        ids: OneOrMany<String>,
    ) -> impl Future<Output = Result<OneOrMany<CrudOutcome>, CrudError>> + Send {
        async move {
            Ok(match ids {
                OneOrMany::One(id) => OneOrMany::One(self.destroy_one(&id).await?),
                OneOrMany::Many(ids) => OneOrMany::Many(self.destroy_many(&ids).await?),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_id() {
        assert_eq!(item_id(&json!({"id": "a1"})), Some("a1".to_string()));
        assert_eq!(item_id(&json!({"id": 7})), Some("7".to_string()));
        assert_eq!(item_id(&json!({"name": "x"})), None);
    }

    #[test]
    fn test_status_serializes_as_token() {
        assert_eq!(serde_json::to_value(CrudStatus::NotFound).unwrap(), json!("Not Found"));
    }
}
