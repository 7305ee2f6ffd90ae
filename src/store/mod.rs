//! Document store access.
//!
//! Business data lives in a managed document database. Handlers never talk
//! to a backend directly; they receive one `Arc<dyn DocumentStore>` built at
//! startup, which tests swap for [`MemoryStore`].
//!
//! Writes are field-level: [`DocumentStore::patch`] only touches the fields it
//! is given, so writers that change different fields of one document do not
//! overwrite each other. Writes that depend on the current contents go
//! through [`update_with_retry`], which pins the version it read and retries
//! when another writer got there first.

mod firestore;
mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Attempts made by [`update_with_retry`] before giving up on a busy document.
pub const MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("document {collection}/{id} could not be decoded: {reason}")]
    Decode {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("document {collection}/{id} could not be encoded: {reason}")]
    Encode {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("document {collection}/{id} was changed by another writer")]
    Conflict { collection: String, id: String },
}

/// A document together with the version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned {
    pub document: Value,
    pub version: String,
}

/// Condition a [`DocumentStore::patch`] must meet to be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// Apply unconditionally, creating the document if needed.
    Any,
    /// The document must not exist yet.
    Missing,
    /// The document must still be at this version.
    Version(String),
}

/// JSON document storage keyed by `(collection, id)`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document and its current version, `Ok(None)` when it does not exist.
    async fn get_versioned(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Versioned>, StoreError>;

    /// Fetch a document, `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .get_versioned(collection, id)
            .await?
            .map(|versioned| versioned.document))
    }

    /// Set the given top-level fields, leaving every other field as stored.
    ///
    /// Fails with [`StoreError::Conflict`] when `precondition` does not hold.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        precondition: Precondition,
    ) -> Result<(), StoreError>;

    /// Documents in `collection` whose top-level `field` equals `value`.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Read a document, let `apply` compute the fields to write, and write them
/// only if the document is still at the version that was read.
///
/// `apply` sees `None` for a missing document; writing then requires that it
/// is still missing. On a conflict the whole cycle runs again, up to
/// [`MAX_WRITE_ATTEMPTS`] times.
///
/// # Errors
/// Returns whatever `apply` returns, any store failure, or
/// [`StoreError::Conflict`] once the attempts are used up.
pub async fn update_with_retry<R, E, F>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    mut apply: F,
) -> Result<R, E>
where
    F: FnMut(Option<Value>) -> Result<(Map<String, Value>, R), E> + Send,
    E: From<StoreError>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = store.get_versioned(collection, id).await?;
        let precondition = current
            .as_ref()
            .map_or(Precondition::Missing, |read| {
                Precondition::Version(read.version.clone())
            });

        let (fields, result) = apply(current.map(|read| read.document))?;
        match store.patch(collection, id, fields, precondition).await {
            Ok(()) => return Ok(result),
            Err(StoreError::Conflict { .. }) => {
                debug!(collection, id, attempt, "concurrent write detected, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(StoreError::Conflict {
        collection: collection.to_string(),
        id: id.to_string(),
    }
    .into())
}

/// Decode a stored document into a typed record.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    collection: &str,
    id: &str,
    document: Value,
) -> Result<T, StoreError> {
    serde_json::from_value(document).map_err(|err| StoreError::Decode {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: err.to_string(),
    })
}

/// Encode a typed record as the top-level fields of a document.
pub(crate) fn encode<T: serde::Serialize>(
    collection: &str,
    id: &str,
    record: &T,
) -> Result<Map<String, Value>, StoreError> {
    let encode_error = |reason: String| StoreError::Encode {
        collection: collection.to_string(),
        id: id.to_string(),
        reason,
    };
    match serde_json::to_value(record).map_err(|err| encode_error(err.to_string()))? {
        Value::Object(fields) => Ok(fields),
        _ => Err(encode_error("record is not an object".to_string())),
    }
}

/// Encode a typed record and keep only `keys`.
pub(crate) fn encode_only<T: serde::Serialize>(
    collection: &str,
    id: &str,
    record: &T,
    keys: &[&str],
) -> Result<Map<String, Value>, StoreError> {
    let mut fields = encode(collection, id, record)?;
    fields.retain(|key, _| keys.contains(&key.as_str()));
    Ok(fields)
}
