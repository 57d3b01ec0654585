// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP status codes for lock failures

use taglock_core::ErrorKind;

/// Status a request handler should answer with when a lock call fails
pub fn http_status(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::CooperativeLock
        | ErrorKind::AssertiveLock
        | ErrorKind::LockAlreadyTaken
        | ErrorKind::LockWasReacquired
        | ErrorKind::LockNotFound => 409,
        ErrorKind::ResourceNotFound => 404,
        ErrorKind::InvalidTag | ErrorKind::InvalidConfig => 400,
        ErrorKind::DbError => 500,
    }
}
