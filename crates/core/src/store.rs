// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document store contract
//!
//! Coordinators need exactly two primitives from the store: a conditional
//! single-document update that evaluates its filter and applies its mutation
//! as one atomic step, and a point read. Both must be linearizable per
//! document.

use crate::predicate::Predicate;
use crate::update::Update;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store operation timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt store data: {0}")]
    Corrupt(String),
}

/// Durability required before a write is acknowledged
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WriteConcernRepr", into = "WriteConcernRepr")]
pub enum WriteConcern {
    /// Durable on a majority of replicas (or on disk, for single-node stores)
    #[default]
    Majority,
    /// Acknowledged by this many nodes
    Acknowledged(u32),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WriteConcernRepr {
    Nodes(u32),
    Named(String),
}

impl TryFrom<WriteConcernRepr> for WriteConcern {
    type Error = String;

    fn try_from(repr: WriteConcernRepr) -> Result<Self, Self::Error> {
        match repr {
            WriteConcernRepr::Nodes(n) => Ok(WriteConcern::Acknowledged(n)),
            WriteConcernRepr::Named(name) if name == "majority" => Ok(WriteConcern::Majority),
            WriteConcernRepr::Named(name) => Err(format!(
                "unknown write concern {name:?}, expected \"majority\" or a node count"
            )),
        }
    }
}

impl From<WriteConcern> for WriteConcernRepr {
    fn from(concern: WriteConcern) -> Self {
        match concern {
            WriteConcern::Majority => WriteConcernRepr::Named("majority".to_string()),
            WriteConcern::Acknowledged(n) => WriteConcernRepr::Nodes(n),
        }
    }
}

/// Options for conditional updates
#[derive(Clone, Copy, Debug)]
pub struct WriteOptions {
    pub write_concern: WriteConcern,
    /// How long the store may wait for the write concern
    pub wtimeout: Duration,
}

/// Options for point reads
#[derive(Clone, Copy, Debug)]
pub struct ReadOptions {
    /// Server-side bound on the read
    pub max_wait: Duration,
}

/// Outcome of a conditional update
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents matching the filter (0 or 1)
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
}

/// Atomic single-document operations
#[async_trait]
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Apply `update` to the first document in `collection` matching `filter`.
    /// Filter evaluation and mutation are one indivisible step.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        update: &Update,
        options: &WriteOptions,
    ) -> Result<UpdateResult, StoreError>;

    /// Return the first document in `collection` matching `filter`
    async fn find_one(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &ReadOptions,
    ) -> Result<Option<Value>, StoreError>;
}

/// Run a store call within a time budget; expiry becomes [`StoreError::Timeout`]
pub async fn within<T, F>(budget: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(budget)),
    }
}

/// A committed mutation of a [`MemoryStore`] document
#[derive(Clone, Debug)]
pub struct AppliedUpdate {
    /// Position of the document within its collection
    pub index: usize,
    pub previous: Value,
    pub current: Value,
    pub modified: bool,
}

/// In-memory, linearizable document store
///
/// All collections sit behind one mutex, so each update's filter check and
/// mutation happen under the same lock. Clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to a collection
    pub fn insert_one(&self, collection: &str, document: Value) {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Snapshot of every document in a collection
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn collection_len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn find_matching(&self, collection: &str, filter: &Predicate) -> Option<Value> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .get(collection)?
            .iter()
            .find(|doc| filter.matches(doc))
            .cloned()
    }

    /// Conditionally update the first matching document
    ///
    /// Returns `None` when nothing matched. A failed update leaves the
    /// document untouched.
    pub fn apply_update(
        &self,
        collection: &str,
        filter: &Predicate,
        update: &Update,
    ) -> Result<Option<AppliedUpdate>, StoreError> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = documents.iter().position(|doc| filter.matches(doc)) else {
            return Ok(None);
        };

        let previous = documents[index].clone();
        let mut current = previous.clone();
        let modified = update.apply(&mut current)?;
        documents[index] = current.clone();

        Ok(Some(AppliedUpdate {
            index,
            previous,
            current,
            modified,
        }))
    }

    /// Overwrite the document at `index`, used to replay and roll back updates
    pub fn replace_at(
        &self,
        collection: &str,
        index: usize,
        document: Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(index))
            .ok_or_else(|| {
                StoreError::Corrupt(format!("no document at {collection}[{index}]"))
            })?;
        *slot = document;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        update: &Update,
        _options: &WriteOptions,
    ) -> Result<UpdateResult, StoreError> {
        Ok(match self.apply_update(collection, filter, update)? {
            Some(applied) => UpdateResult {
                matched: 1,
                modified: u64::from(applied.modified),
            },
            None => UpdateResult::default(),
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Predicate,
        _options: &ReadOptions,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self.find_matching(collection, filter))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
