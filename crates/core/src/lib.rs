// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! taglock-core: advisory locks on documents in an atomic-update store
//!
//! This crate provides:
//! - A typed predicate/update language over JSON documents
//! - The `DocumentStore` contract and an in-memory reference store
//! - Filter augmentation for tag relationships and staleness
//! - `MultiLock` (relational, multi-tag) and `WriteLock` (exclusive) coordinators

pub mod clock;
pub mod id;

pub mod predicate;
pub mod store;
pub mod update;

pub mod config;
pub mod error;
pub mod filter;

// Coordinators
pub mod multi_lock;
pub mod write_lock;

// Re-exports
pub use clock::{Clock, EpochMillis, FakeClock, SystemClock};
pub use config::{
    ConfigError, LockOverrides, MultiLockConfig, RelationshipGraph, TagRelationships, Timeouts,
    WriteLockConfig,
};
pub use error::{ErrorKind, LockError};
pub use filter::{augment, LockType, LOCK_FIELD};
pub use id::{HolderId, IdGen, SequentialIdGen, UuidIdGen};
pub use multi_lock::{holders_of, HolderRecord, LockHandle, MultiLock};
pub use predicate::Predicate;
pub use store::{
    DocumentStore, MemoryStore, ReadOptions, StoreError, UpdateResult, WriteConcern, WriteOptions,
};
pub use update::Update;
pub use write_lock::{WriteLock, WriteLockState};
