use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{DocumentStore, Precondition, StoreError, Versioned};

#[derive(Debug)]
struct Stored {
    fields: Map<String, Value>,
    version: u64,
}

/// In-process store for local runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Stored>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_versioned(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Versioned>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|stored| Versioned {
                document: Value::Object(stored.fields.clone()),
                version: stored.version.to_string(),
            }))
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        let current = documents.get(id).map(|stored| stored.version.to_string());

        let holds = match (&precondition, &current) {
            (Precondition::Any, _) | (Precondition::Missing, None) => true,
            (Precondition::Version(expected), Some(actual)) => expected == actual,
            _ => false,
        };
        if !holds {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let stored = documents.entry(id.to_string()).or_insert_with(|| Stored {
            fields: Map::new(),
            version: 0,
        });
        stored.fields.extend(fields);
        stored.version += 1;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, stored)| stored.fields.get(field) == Some(value))
                    .map(|(id, stored)| (id.clone(), Value::Object(stored.fields.clone())))
                    .collect()
            })
            .unwrap_or_default())
    }
}
