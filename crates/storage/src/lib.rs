// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! taglock-storage: durable document store for lock coordinators

pub mod journal;
pub mod journaled;

pub use journal::{Journal, JournalEntry, JournalFile, JournalOp, StorageError};
pub use journaled::JournaledStore;
