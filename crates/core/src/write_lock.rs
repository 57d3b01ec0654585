// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-tag exclusive write lock
//!
//! Stores `lock: {active, timestamp}` on the resource. A lock that is not
//! active, or whose grant is older than the lock timeout, is free. The
//! timestamp returned by [`WriteLock::acquire`] doubles as a fencing token
//! for [`WriteLock::release`].

use crate::clock::{duration_millis, Clock, EpochMillis, SystemClock};
use crate::config::WriteLockConfig;
use crate::error::LockError;
use crate::filter::LOCK_FIELD;
use crate::predicate::{resolve, Predicate};
use crate::store::{within, DocumentStore};
use crate::update::Update;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Write lock state as stored in a resource document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteLockState {
    pub active: bool,
    pub timestamp: EpochMillis,
}

impl WriteLockState {
    /// Read the state from a resource document, if it has one
    pub fn from_document(document: &Value) -> Option<Self> {
        resolve(document, LOCK_FIELD).and_then(|lock| serde_json::from_value(lock.clone()).ok())
    }
}

/// Exclusive lock coordinator over a document store
#[derive(Clone, Debug)]
pub struct WriteLock<S, C = SystemClock> {
    store: S,
    config: WriteLockConfig,
    clock: C,
}

impl<S: DocumentStore> WriteLock<S> {
    pub fn new(store: S, config: WriteLockConfig) -> Self {
        Self {
            store,
            config,
            clock: SystemClock,
        }
    }
}

impl<S, C> WriteLock<S, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> WriteLock<S, C2> {
        WriteLock {
            store: self.store,
            config: self.config,
            clock,
        }
    }

    pub fn config(&self) -> &WriteLockConfig {
        &self.config
    }
}

impl<S: DocumentStore, C: Clock> WriteLock<S, C> {
    /// Acquire using the configured lock timeout
    pub async fn acquire(&self, filter: &Predicate) -> Result<EpochMillis, LockError> {
        self.acquire_with_timeout(filter, self.config.lock_timeout)
            .await
    }

    /// Acquire, treating grants older than `lock_timeout` as stale
    ///
    /// Returns the grant timestamp, to be passed back to [`WriteLock::release`].
    pub async fn acquire_with_timeout(
        &self,
        filter: &Predicate,
        lock_timeout: Duration,
    ) -> Result<EpochMillis, LockError> {
        let now = self.clock.now_millis();
        let cutoff = now.saturating_sub(duration_millis(lock_timeout));
        let free = Predicate::any(vec![
            Predicate::missing(LOCK_FIELD),
            Predicate::eq(active_path(), false),
            Predicate::lte(timestamp_path(), cutoff),
        ]);
        let grant = Update::set(LOCK_FIELD, json!({ "active": true, "timestamp": now }));

        let result = within(
            self.config.timeout,
            self.store.update_one(
                &self.config.collection,
                &filter.clone().and(free),
                &grant,
                &self.config.write_options(),
            ),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "write lock acquire failed");
            LockError::db(e)
        })?;

        if result.matched == 0 {
            return Err(if self.resource_exists(filter).await? {
                debug!(cutoff, "write lock held");
                LockError::LockAlreadyTaken
            } else {
                LockError::ResourceNotFound
            });
        }

        info!(timestamp = now, "write lock acquired");
        Ok(now)
    }

    /// Release the lock
    ///
    /// With a `timestamp`, only the grant made at that time is released and a
    /// newer grant is reported as [`LockError::LockWasReacquired`]. Without
    /// one, whichever grant is current is released.
    pub async fn release(
        &self,
        filter: &Predicate,
        timestamp: Option<EpochMillis>,
    ) -> Result<(), LockError> {
        let target = match timestamp {
            Some(ts) => filter.clone().and(Predicate::eq(timestamp_path(), ts)),
            None => filter.clone(),
        };

        let result = within(
            self.config.timeout,
            self.store.update_one(
                &self.config.collection,
                &target,
                &Update::set(active_path(), false),
                &self.config.write_options(),
            ),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "write lock release failed");
            LockError::db(e)
        })?;

        if result.matched == 0 {
            // without a fencing token there is nothing to compare against
            if timestamp.is_some() && self.resource_exists(filter).await? {
                return Err(LockError::LockWasReacquired);
            }
            return Err(LockError::ResourceNotFound);
        }

        info!(?timestamp, "write lock released");
        Ok(())
    }

    async fn resource_exists(&self, filter: &Predicate) -> Result<bool, LockError> {
        within(
            self.config.timeout,
            self.store.find_one(
                &self.config.collection,
                filter,
                &self.config.read_options(),
            ),
        )
        .await
        .map(|found| found.is_some())
        .map_err(LockError::db)
    }
}

fn active_path() -> String {
    format!("{LOCK_FIELD}.active")
}

fn timestamp_path() -> String {
    format!("{LOCK_FIELD}.timestamp")
}

#[cfg(test)]
#[path = "write_lock_tests.rs"]
mod tests;
