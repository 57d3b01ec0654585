// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-tag relational lock
//!
//! Each resource document carries `lock.<tag>`: a list of holder records
//! `{timestamp, id}`. Several holders may share a tag. Whether a tag may be
//! granted depends on the other tags it is related to:
//!
//! - **cooperative** tags must be free before the holder record is written.
//!   The check and the write are one conditional update.
//! - **assertive** tags are checked afterwards with a point read. When one is
//!   still live the grant stays recorded and the caller receives
//!   [`LockError::AssertiveLock`] with the handle, to re-verify or release.
//!
//! Stale holders (older than their tag's timeout) count as free. This is the
//! only way a crashed holder's lock is recovered.

use crate::clock::{Clock, EpochMillis, SystemClock};
use crate::config::{validate_tag, ConfigError, LockOverrides, MultiLockConfig};
use crate::error::LockError;
use crate::filter::{augment, tag_path, LockType};
use crate::id::{HolderId, IdGen, UuidIdGen};
use crate::predicate::{resolve, Predicate};
use crate::store::{within, DocumentStore};
use crate::update::Update;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Capability returned on grant; required verbatim to release
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockHandle {
    pub tag: String,
    /// Epoch milliseconds at which the grant was recorded
    pub timestamp: EpochMillis,
    pub id: HolderId,
}

/// One entry of a tag's holder list as stored in the document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderRecord {
    pub timestamp: EpochMillis,
    pub id: HolderId,
}

/// Holder records of `tag` in a resource document
///
/// Entries that do not parse as holder records are skipped.
pub fn holders_of(document: &Value, tag: &str) -> Vec<HolderRecord> {
    resolve(document, &tag_path(tag))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Relational lock coordinator over a document store
#[derive(Clone, Debug)]
pub struct MultiLock<S, C = SystemClock, I = UuidIdGen> {
    store: S,
    config: MultiLockConfig,
    clock: C,
    id_gen: I,
}

impl<S: DocumentStore> MultiLock<S> {
    /// Validate `config` and build a coordinator using the system clock and
    /// UUID holder ids
    pub fn new(store: S, config: MultiLockConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            clock: SystemClock,
            id_gen: UuidIdGen,
        })
    }
}

impl<S, C, I> MultiLock<S, C, I> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> MultiLock<S, C2, I> {
        MultiLock {
            store: self.store,
            config: self.config,
            clock,
            id_gen: self.id_gen,
        }
    }

    pub fn with_id_gen<I2: IdGen>(self, id_gen: I2) -> MultiLock<S, C, I2> {
        MultiLock {
            store: self.store,
            config: self.config,
            clock: self.clock,
            id_gen,
        }
    }

    pub fn config(&self) -> &MultiLockConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, C, I> MultiLock<S, C, I>
where
    S: DocumentStore,
    C: Clock,
    I: IdGen,
{
    /// Acquire `tag` on the resource matching `filter`
    ///
    /// Reserves a holder record if every cooperative dependency is free, then
    /// verifies the assertive dependencies as of the reservation time.
    pub async fn acquire(&self, filter: &Predicate, tag: &str) -> Result<LockHandle, LockError> {
        self.acquire_in(&self.config, filter, tag).await
    }

    /// [`acquire`](Self::acquire) with per-call configuration overrides
    pub async fn acquire_with(
        &self,
        filter: &Predicate,
        tag: &str,
        overrides: &LockOverrides,
    ) -> Result<LockHandle, LockError> {
        let config = self.merged(overrides)?;
        self.acquire_in(&config, filter, tag).await
    }

    /// Re-check the assertive dependencies of an already recorded grant
    ///
    /// Staleness is judged as of the grant's own timestamp. Nothing is
    /// written; on success the handle comes back unchanged.
    pub async fn reverify(
        &self,
        filter: &Predicate,
        handle: &LockHandle,
    ) -> Result<LockHandle, LockError> {
        validate_tag(&handle.tag).map_err(|_| LockError::InvalidTag(handle.tag.clone()))?;
        self.verify(&self.config, filter, handle.clone()).await
    }

    /// [`reverify`](Self::reverify) with per-call configuration overrides
    pub async fn reverify_with(
        &self,
        filter: &Predicate,
        handle: &LockHandle,
        overrides: &LockOverrides,
    ) -> Result<LockHandle, LockError> {
        validate_tag(&handle.tag).map_err(|_| LockError::InvalidTag(handle.tag.clone()))?;
        let config = self.merged(overrides)?;
        self.verify(&config, filter, handle.clone()).await
    }

    /// Remove the holder record identified by `handle`
    pub async fn release(&self, filter: &Predicate, handle: &LockHandle) -> Result<(), LockError> {
        self.release_in(&self.config, filter, handle).await
    }

    /// [`release`](Self::release) with per-call configuration overrides
    pub async fn release_with(
        &self,
        filter: &Predicate,
        handle: &LockHandle,
        overrides: &LockOverrides,
    ) -> Result<(), LockError> {
        let config = self.merged(overrides)?;
        self.release_in(&config, filter, handle).await
    }

    fn merged(&self, overrides: &LockOverrides) -> Result<MultiLockConfig, LockError> {
        self.config.merged(overrides).map_err(|e| {
            warn!(error = %e, "rejected lock overrides");
            LockError::InvalidConfig(e)
        })
    }

    async fn acquire_in(
        &self,
        config: &MultiLockConfig,
        filter: &Predicate,
        tag: &str,
    ) -> Result<LockHandle, LockError> {
        validate_tag(tag).map_err(|_| LockError::InvalidTag(tag.to_string()))?;

        let now = self.clock.now_millis();
        let id = self.id_gen.next();
        let reserve = augmented(config, filter, tag, LockType::Cooperative, now);
        let push = Update::push(
            tag_path(tag),
            json!({ "timestamp": now, "id": id.as_str() }),
        );

        let result = within(
            config.timeout,
            self.store
                .update_one(&config.collection, &reserve, &push, &config.write_options()),
        )
        .await
        .map_err(|e| {
            warn!(tag, error = %e, "reservation failed");
            LockError::db(e)
        })?;

        if result.matched == 0 {
            return Err(if self.resource_exists(config, filter).await? {
                debug!(tag, "denied by cooperative holder");
                LockError::CooperativeLock {
                    tag: tag.to_string(),
                }
            } else {
                LockError::ResourceNotFound
            });
        }

        let handle = LockHandle {
            tag: tag.to_string(),
            timestamp: now,
            id,
        };
        debug!(tag, id = %handle.id, timestamp = now, "reserved");
        self.verify(config, filter, handle).await
    }

    async fn release_in(
        &self,
        config: &MultiLockConfig,
        filter: &Predicate,
        handle: &LockHandle,
    ) -> Result<(), LockError> {
        validate_tag(&handle.tag).map_err(|_| LockError::InvalidTag(handle.tag.clone()))?;

        let path = tag_path(&handle.tag);
        let holder = Predicate::eq("id", handle.id.as_str());
        let target = filter
            .clone()
            .and(Predicate::elem_match(&path, holder.clone()));

        let result = within(
            config.timeout,
            self.store.update_one(
                &config.collection,
                &target,
                &Update::pull(path, holder),
                &config.write_options(),
            ),
        )
        .await
        .map_err(|e| {
            warn!(tag = %handle.tag, id = %handle.id, error = %e, "release failed");
            LockError::db(e)
        })?;

        if result.matched == 0 {
            return Err(if self.resource_exists(config, filter).await? {
                LockError::LockNotFound
            } else {
                LockError::ResourceNotFound
            });
        }

        info!(tag = %handle.tag, id = %handle.id, "released");
        Ok(())
    }

    async fn verify(
        &self,
        config: &MultiLockConfig,
        filter: &Predicate,
        handle: LockHandle,
    ) -> Result<LockHandle, LockError> {
        let check = augmented(config, filter, &handle.tag, LockType::Assertive, handle.timestamp);

        let found = within(
            config.timeout,
            self.store
                .find_one(&config.collection, &check, &config.read_options()),
        )
        .await;

        match found {
            Ok(Some(_)) => {
                info!(tag = %handle.tag, id = %handle.id, "granted");
                Ok(handle)
            }
            Ok(None) => {
                debug!(tag = %handle.tag, id = %handle.id, "pending on assertive holder");
                Err(LockError::AssertiveLock { handle })
            }
            Err(e) => {
                warn!(tag = %handle.tag, id = %handle.id, error = %e, "verification failed");
                Err(LockError::db_after_grant(e, handle))
            }
        }
    }

    /// Tell a missing resource apart from a conflict, within the same budget
    async fn resource_exists(
        &self,
        config: &MultiLockConfig,
        filter: &Predicate,
    ) -> Result<bool, LockError> {
        within(
            config.timeout,
            self.store
                .find_one(&config.collection, filter, &config.read_options()),
        )
        .await
        .map(|found| found.is_some())
        .map_err(LockError::db)
    }
}

fn augmented(
    config: &MultiLockConfig,
    filter: &Predicate,
    tag: &str,
    lock_type: LockType,
    reference: EpochMillis,
) -> Predicate {
    augment(
        filter,
        tag,
        &config.relationships,
        &config.timeouts,
        lock_type,
        reference,
    )
}

#[cfg(test)]
#[path = "multi_lock_tests.rs"]
mod tests;
