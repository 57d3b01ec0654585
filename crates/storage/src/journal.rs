// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only journal of committed document mutations
//!
//! One JSON line per entry, each carrying a sequence number and a CRC32 of
//! its operation. Opening a journal replays every intact entry and cuts off
//! whatever follows the first torn or corrupt one, so later appends never
//! land behind garbage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use taglock_core::{MemoryStore, StoreError, WriteConcern};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors that can occur in journal operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("journal replay failed at sequence {sequence}: {source}")]
    Replay {
        sequence: u64,
        #[source]
        source: StoreError,
    },
    #[error("journal tail could not be restored after a failed append")]
    Broken,
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => StoreError::Io(e),
            StorageError::Json(e) => StoreError::Json(e),
            other => StoreError::Corrupt(other.to_string()),
        }
    }
}

/// A committed mutation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalOp {
    /// A document was added to the end of a collection
    Insert { collection: String, document: Value },
    /// The document at `index` now has this content
    Replace {
        collection: String,
        index: usize,
        document: Value,
    },
}

impl JournalOp {
    /// Re-apply to an in-memory store
    pub fn replay(&self, store: &MemoryStore) -> Result<(), StoreError> {
        match self {
            JournalOp::Insert {
                collection,
                document,
            } => {
                store.insert_one(collection, document.clone());
                Ok(())
            }
            JournalOp::Replace {
                collection,
                index,
                document,
            } => store.replace_at(collection, *index, document.clone()),
        }
    }
}

/// A single line of the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub op: JournalOp,
    /// CRC32 of the serialized operation
    pub checksum: u32,
}

impl JournalEntry {
    pub fn new(sequence: u64, op: JournalOp) -> Result<Self, StorageError> {
        let checksum = Self::calculate_checksum(&op)?;
        Ok(Self {
            sequence,
            op,
            checksum,
        })
    }

    fn calculate_checksum(op: &JournalOp) -> Result<u32, StorageError> {
        let json = serde_json::to_string(op)?;
        Ok(crc32fast::hash(json.as_bytes()))
    }

    /// Verify the checksum matches the operation
    pub fn verify(&self) -> bool {
        Self::calculate_checksum(&self.op).is_ok_and(|c| c == self.checksum)
    }

    pub fn to_line(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Backing file of a [`Journal`]
pub trait JournalFile: Write {
    fn current_len(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    /// Make written data durable
    fn sync(&mut self) -> io::Result<()>;
}

impl JournalFile for File {
    fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Journal writer
#[derive(Debug)]
pub struct Journal<F = File> {
    path: PathBuf,
    file: F,
    next_sequence: u64,
    // set when a failed append left bytes that could not be cut off
    broken: bool,
}

impl Journal {
    /// Open or create a journal, returning it with the intact entries to replay
    pub fn open(path: &Path) -> Result<(Self, Vec<JournalEntry>), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let contents = String::from_utf8_lossy(&bytes);

        let mut entries = Vec::new();
        let mut valid_len = 0usize;
        let mut next_sequence = 0u64;

        for line in contents.split_inclusive('\n') {
            let Some(body) = line.strip_suffix('\n') else {
                warn!(path = %path.display(), "dropping unterminated journal tail");
                break;
            };
            if body.trim().is_empty() {
                valid_len += line.len();
                continue;
            }
            match JournalEntry::from_line(body) {
                Ok(entry) if entry.verify() => {
                    next_sequence = entry.sequence + 1;
                    entries.push(entry);
                    valid_len += line.len();
                }
                Ok(entry) => {
                    warn!(sequence = entry.sequence, "journal checksum mismatch, truncating");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "unreadable journal entry, truncating");
                    break;
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let valid_len = valid_len as u64;
        if file.metadata()?.len() > valid_len {
            file.set_len(valid_len)?;
        }

        debug!(path = %path.display(), entries = entries.len(), next_sequence, "journal opened");
        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                next_sequence,
                broken: false,
            },
            entries,
        ))
    }
}

impl<F: JournalFile> Journal<F> {
    /// Append an operation, returning its sequence number
    ///
    /// `Majority` syncs the data to disk before returning; acknowledged
    /// writes are only flushed to the OS. On failure the file is cut back to
    /// its length before the call, so no partial or unacknowledged entry
    /// survives.
    pub fn append(&mut self, op: JournalOp, concern: WriteConcern) -> Result<u64, StorageError> {
        if self.broken {
            return Err(StorageError::Broken);
        }

        let sequence = self.next_sequence;
        let line = JournalEntry::new(sequence, op)?.to_line()?;
        let good_len = self.file.current_len()?;

        if let Err(e) = self.write_line(&line, concern) {
            warn!(sequence, error = %e, "journal append failed, restoring tail");
            if let Err(restore) = self.file.truncate_to(good_len) {
                error!(sequence, error = %restore, "journal tail restore failed");
                self.broken = true;
            }
            return Err(e.into());
        }

        self.next_sequence += 1;
        Ok(sequence)
    }

    fn write_line(&mut self, line: &str, concern: WriteConcern) -> io::Result<()> {
        writeln!(self.file, "{line}")?;
        match concern {
            WriteConcern::Majority => self.file.sync(),
            WriteConcern::Acknowledged(_) => self.file.flush(),
        }
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
