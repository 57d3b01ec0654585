// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use taglock_core::{
    DocumentStore, Predicate, ReadOptions, StoreError, Update, UpdateResult, WriteOptions,
};
use tracing::Instrument;

/// Wrapper that adds tracing to any DocumentStore
#[derive(Clone, Debug)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for TracedStore<S> {
    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        update: &Update,
        options: &WriteOptions,
    ) -> Result<UpdateResult, StoreError> {
        let span = tracing::info_span!("store.update_one", collection, path = update.path());

        async {
            tracing::debug!(?filter, ?update, write_concern = ?options.write_concern, "updating");

            let start = Instant::now();
            let result = self.inner.update_one(collection, filter, update, options).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(r) => tracing::info!(
                    matched = r.matched,
                    modified = r.modified,
                    elapsed_ms,
                    "update applied"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "update failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &ReadOptions,
    ) -> Result<Option<Value>, StoreError> {
        let span = tracing::info_span!("store.find_one", collection);

        async {
            tracing::debug!(?filter, max_wait_ms = options.max_wait.as_millis() as u64, "reading");

            let start = Instant::now();
            let result = self.inner.find_one(collection, filter, options).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(found) => tracing::info!(found = found.is_some(), elapsed_ms, "read complete"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "read failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
