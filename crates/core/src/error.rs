// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock coordinator errors
//!
//! [`ErrorKind`] is the machine-readable outcome. Mapping kinds onto a
//! transport's status codes is left to the caller.

use crate::config::ConfigError;
use crate::multi_lock::LockHandle;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of an acquire or release
#[derive(Debug, Error)]
pub enum LockError {
    /// A cooperative dependency of the tag has a live holder
    #[error("CooperativeLock: tag {tag:?} is blocked by a live cooperative holder")]
    CooperativeLock { tag: String },

    /// The grant is recorded but an assertive dependency is still live
    #[error("AssertiveLock: tag {:?} is held but an assertive dependency is still live", .handle.tag)]
    AssertiveLock { handle: LockHandle },

    #[error("ResourceNotFound")]
    ResourceNotFound,

    /// The write lock is held and not stale
    #[error("LockAlreadyTaken")]
    LockAlreadyTaken,

    /// The write lock was granted again after the caller's grant
    #[error("LockWasReacquired")]
    LockWasReacquired,

    /// No holder record matches the handle
    #[error("LockNotFound")]
    LockNotFound,

    #[error("InvalidTag: {0:?}")]
    InvalidTag(String),

    /// Per-call overrides produced a graph the coordinator cannot evaluate
    #[error("InvalidConfig: {0}")]
    InvalidConfig(#[source] ConfigError),

    /// The store failed or timed out
    ///
    /// `granted` is set when the failure happened after a holder record was
    /// already written, so the caller can still release it.
    #[error("DbError: {source}")]
    Db {
        #[source]
        source: StoreError,
        granted: Option<LockHandle>,
    },
}

/// Machine-readable error category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    CooperativeLock,
    AssertiveLock,
    ResourceNotFound,
    LockAlreadyTaken,
    LockWasReacquired,
    LockNotFound,
    InvalidTag,
    InvalidConfig,
    DbError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::CooperativeLock => "CooperativeLock",
            ErrorKind::AssertiveLock => "AssertiveLock",
            ErrorKind::ResourceNotFound => "ResourceNotFound",
            ErrorKind::LockAlreadyTaken => "LockAlreadyTaken",
            ErrorKind::LockWasReacquired => "LockWasReacquired",
            ErrorKind::LockNotFound => "LockNotFound",
            ErrorKind::InvalidTag => "InvalidTag",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::DbError => "DbError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LockError {
    pub(crate) fn db(source: StoreError) -> Self {
        LockError::Db {
            source,
            granted: None,
        }
    }

    pub(crate) fn db_after_grant(source: StoreError, handle: LockHandle) -> Self {
        LockError::Db {
            source,
            granted: Some(handle),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::CooperativeLock { .. } => ErrorKind::CooperativeLock,
            LockError::AssertiveLock { .. } => ErrorKind::AssertiveLock,
            LockError::ResourceNotFound => ErrorKind::ResourceNotFound,
            LockError::LockAlreadyTaken => ErrorKind::LockAlreadyTaken,
            LockError::LockWasReacquired => ErrorKind::LockWasReacquired,
            LockError::LockNotFound => ErrorKind::LockNotFound,
            LockError::InvalidTag(_) => ErrorKind::InvalidTag,
            LockError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            LockError::Db { .. } => ErrorKind::DbError,
        }
    }

    /// Handle of a grant that is persisted despite the error
    pub fn granted_handle(&self) -> Option<&LockHandle> {
        match self {
            LockError::AssertiveLock { handle } => Some(handle),
            LockError::Db { granted, .. } => granted.as_ref(),
            _ => None,
        }
    }
}
