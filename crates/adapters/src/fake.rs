// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake document store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taglock_core::{
    DocumentStore, MemoryStore, Predicate, ReadOptions, StoreError, Update, UpdateResult,
    WriteOptions,
};

/// Recorded store call
#[derive(Debug, Clone)]
pub enum StoreCall {
    UpdateOne {
        collection: String,
        filter: Predicate,
        update: Update,
    },
    FindOne {
        collection: String,
        filter: Predicate,
    },
}

#[derive(Debug, Default)]
struct Faults {
    failing_updates: usize,
    failing_reads: usize,
    update_delay: Option<Duration>,
    read_delay: Option<Duration>,
}

/// Fake document store for testing
///
/// Backed by a [`MemoryStore`]; records every call and can be told to fail
/// or stall upcoming ones.
#[derive(Clone, Debug, Default)]
pub struct FakeStore {
    memory: MemoryStore,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    faults: Arc<Mutex<Faults>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document
    pub fn insert_one(&self, collection: &str, document: Value) {
        self.memory.insert_one(collection, document);
    }

    /// Snapshot of every document in a collection
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.memory.documents(collection)
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Make the next `count` updates fail without touching any document
    pub fn fail_updates(&self, count: usize) {
        self.faults().failing_updates = count;
    }

    /// Make the next `count` reads fail
    pub fn fail_reads(&self, count: usize) {
        self.faults().failing_reads = count;
    }

    /// Stall every update before it is applied
    pub fn delay_updates(&self, delay: Duration) {
        self.faults().update_delay = Some(delay);
    }

    /// Stall every read before it is served
    pub fn delay_reads(&self, delay: Duration) {
        self.faults().read_delay = Some(delay);
    }

    /// Clear all injected failures and delays
    pub fn heal(&self) {
        *self.faults() = Faults::default();
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

fn take_failure(remaining: &mut usize) -> bool {
    if *remaining == 0 {
        return false;
    }
    *remaining -= 1;
    true
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        update: &Update,
        options: &WriteOptions,
    ) -> Result<UpdateResult, StoreError> {
        self.record(StoreCall::UpdateOne {
            collection: collection.to_string(),
            filter: filter.clone(),
            update: update.clone(),
        });

        let (fail, delay) = {
            let mut faults = self.faults();
            (take_failure(&mut faults.failing_updates), faults.update_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable("injected update failure".to_string()));
        }

        self.memory
            .update_one(collection, filter, update, options)
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &ReadOptions,
    ) -> Result<Option<Value>, StoreError> {
        self.record(StoreCall::FindOne {
            collection: collection.to_string(),
            filter: filter.clone(),
        });

        let (fail, delay) = {
            let mut faults = self.faults();
            (take_failure(&mut faults.failing_reads), faults.read_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }

        self.memory.find_one(collection, filter, options).await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
