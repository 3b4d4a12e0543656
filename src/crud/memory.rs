//! In-memory queryset.

use dashmap::DashMap;
use serde_json::Value;

use crate::crud::queryset::{item_id, CrudError, CrudOutcome, CrudStatus, Queryset};

/// Items keyed by their `id`, held in a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryQueryset {
    items: DashMap<String, Value>,
}

impl MemoryQueryset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.items.get(id).map(|entry| entry.value().clone())
    }

    fn upsert(&self, item: Value) -> Result<CrudStatus, CrudError> {
        let id = item_id(&item).ok_or_else(|| CrudError::Invalid("item has no id".into()))?;
        Ok(match self.items.insert(id, item) {
            Some(_) => CrudStatus::Updated,
            None => CrudStatus::Created,
        })
    }
}

impl Queryset for MemoryQueryset {
    async fn create_one(&self, item: Value) -> Result<CrudOutcome, CrudError> {
        let status = self.upsert(item.clone())?;
        Ok((status, item))
    }

    async fn read_all(&self) -> Result<Vec<CrudOutcome>, CrudError> {
        let mut items: Vec<(String, Value)> = self
            .items
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(items.into_iter().map(|(_, item)| (CrudStatus::Ok, item)).collect())
    }

    async fn read_one(&self, id: &str) -> Result<CrudOutcome, CrudError> {
        Ok(match self.get(id) {
            Some(item) => (CrudStatus::Ok, item),
            None => (CrudStatus::NotFound, Value::String(id.to_string())),
        })
    }

    async fn update_one(&self, item: Value) -> Result<CrudOutcome, CrudError> {
        self.upsert(item.clone())?;
        Ok((CrudStatus::Updated, item))
    }

    async fn destroy_one(&self, id: &str) -> Result<CrudOutcome, CrudError> {
        match self.items.remove(id) {
            Some((_, item)) => Ok((CrudStatus::Ok, item)),
            None => Err(CrudError::NotFound(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::queryset::OneOrMany;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_update_status() {
        let store = MemoryQueryset::new();
        let (status, _) = store.create_one(json!({"id": "1", "text": "a"})).await.unwrap();
        assert_eq!(status, CrudStatus::Created);
        let (status, _) = store.create_one(json!({"id": "1", "text": "b"})).await.unwrap();
        assert_eq!(status, CrudStatus::Updated);
        assert_eq!(store.get("1").unwrap()["text"], "b");
    }

    #[tokio::test]
    async fn test_create_without_id_is_invalid() {
        let store = MemoryQueryset::new();
        assert!(matches!(
            store.create_one(json!({"text": "a"})).await,
            Err(CrudError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_read_dispatch() {
        let store = MemoryQueryset::new();
        store.create_one(json!({"id": "b"})).await.unwrap();
        store.create_one(json!({"id": "a"})).await.unwrap();

        let OneOrMany::Many(all) = store.read(None).await.unwrap() else {
            panic!("expected a batch");
        };
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1["id"], "a");

        let OneOrMany::Many(some) = store
            .read(Some(OneOrMany::Many(vec!["a".into(), "zz".into()])))
            .await
            .unwrap()
        else {
            panic!("expected a batch");
        };
        assert_eq!(some[0].0, CrudStatus::Ok);
        assert_eq!(some[1], (CrudStatus::NotFound, json!("zz")));
    }

    #[tokio::test]
    async fn test_destroy_unknown_is_not_found() {
        let store = MemoryQueryset::new();
        assert!(matches!(
            store.destroy_one("nope").await,
            Err(CrudError::NotFound(id)) if id == "nope"
        ));

        store.create_one(json!({"id": "1"})).await.unwrap();
        assert!(matches!(
            store.destroy_many(&["1".into(), "2".into()]).await,
            Err(CrudError::NotFound(id)) if id == "2"
        ));
        assert!(store.is_empty());
    }
}
