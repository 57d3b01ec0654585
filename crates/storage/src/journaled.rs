// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journaled document store
//!
//! Serves reads and conditional updates from an in-memory store and records
//! every committed mutation in a [`Journal`] before acknowledging it. A
//! mutation whose journal append fails is rolled back in memory.

use crate::journal::{Journal, JournalOp, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use taglock_core::{
    DocumentStore, MemoryStore, Predicate, ReadOptions, StoreError, Update, UpdateResult,
    WriteConcern, WriteOptions,
};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Document store persisted through a journal
#[derive(Clone, Debug)]
pub struct JournaledStore {
    memory: MemoryStore,
    // Serializes mutations so journal order matches commit order
    journal: Arc<Mutex<Journal>>,
}

impl JournaledStore {
    /// Open the journal at `path` and rebuild the documents it records
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let (journal, entries) = Journal::open(path)?;
        let memory = MemoryStore::new();
        for entry in &entries {
            entry.op.replay(&memory).map_err(|source| StorageError::Replay {
                sequence: entry.sequence,
                source,
            })?;
        }
        info!(path = %path.display(), replayed = entries.len(), "journaled store opened");

        Ok(Self {
            memory,
            journal: Arc::new(Mutex::new(journal)),
        })
    }

    /// Durably add a document
    pub async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StorageError> {
        let mut journal = self.journal.lock().await;
        journal.append(
            JournalOp::Insert {
                collection: collection.to_string(),
                document: document.clone(),
            },
            WriteConcern::Majority,
        )?;
        self.memory.insert_one(collection, document);
        Ok(())
    }

    /// Snapshot of every document in a collection
    pub async fn documents(&self, collection: &str) -> Vec<Value> {
        let _journal = self.journal.lock().await;
        self.memory.documents(collection)
    }
}

#[async_trait]
impl DocumentStore for JournaledStore {
    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        update: &Update,
        options: &WriteOptions,
    ) -> Result<UpdateResult, StoreError> {
        let mut journal = self.journal.lock().await;

        let Some(applied) = self.memory.apply_update(collection, filter, update)? else {
            return Ok(UpdateResult::default());
        };

        if applied.modified {
            let op = JournalOp::Replace {
                collection: collection.to_string(),
                index: applied.index,
                document: applied.current,
            };
            if let Err(e) = journal.append(op, options.write_concern) {
                error!(collection, index = applied.index, error = %e, "journal append failed, rolling back");
                self.memory
                    .replace_at(collection, applied.index, applied.previous)?;
                return Err(e.into());
            }
        }

        Ok(UpdateResult {
            matched: 1,
            modified: u64::from(applied.modified),
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Predicate,
        _options: &ReadOptions,
    ) -> Result<Option<Value>, StoreError> {
        // reads wait for in-flight mutations so a rolled-back write is never observed
        let _journal = self.journal.lock().await;
        Ok(self.memory.find_matching(collection, filter))
    }
}

#[cfg(test)]
#[path = "journaled_tests.rs"]
mod tests;
