//! Store wrapper that forces writers to interleave.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Barrier;

use super::{DocumentStore, MemoryStore, Precondition, StoreError, Versioned};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    Read,
    Write,
}

/// A [`MemoryStore`] whose first `parties` reads (or writes) wait for each
/// other before going through, so concurrent callers all act on the same state.
pub(crate) struct GatedStore {
    inner: MemoryStore,
    gate: Gate,
    parties: usize,
    barrier: Barrier,
    remaining: AtomicUsize,
}

impl GatedStore {
    pub(crate) fn on_read(parties: usize) -> Self {
        Self::new(Gate::Read, parties)
    }

    pub(crate) fn on_write(parties: usize) -> Self {
        Self::new(Gate::Write, parties)
    }

    fn new(gate: Gate, parties: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            gate,
            parties,
            barrier: Barrier::new(parties),
            remaining: AtomicUsize::new(0),
        }
    }

    /// Start gating. Calls made before this pass straight through.
    pub(crate) fn arm(&self) {
        self.remaining.store(self.parties, Ordering::SeqCst);
    }

    async fn pass(&self, gate: Gate) {
        if gate != self.gate {
            return;
        }
        let admitted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if admitted {
            self.barrier.wait().await;
        }
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn get_versioned(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Versioned>, StoreError> {
        let read = self.inner.get_versioned(collection, id).await;
        self.pass(Gate::Read).await;
        read
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        self.pass(Gate::Write).await;
        self.inner.patch(collection, id, fields, precondition).await
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        self.inner.query(collection, field, value).await
    }
}
