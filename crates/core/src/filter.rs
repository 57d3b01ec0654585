// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter augmentation
//!
//! Extends a caller's resource filter with the condition "every tag related
//! to `tag` is free". A related tag is free when it has no holder records
//! newer than `reference - timeout`.

use crate::clock::{duration_millis, EpochMillis};
use crate::config::{RelationshipGraph, Timeouts};
use crate::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Document field holding all lock state
pub const LOCK_FIELD: &str = "lock";

/// Which relationship list of a tag to check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    Cooperative,
    Assertive,
}

impl std::fmt::Display for LockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockType::Cooperative => write!(f, "cooperative"),
            LockType::Assertive => write!(f, "assertive"),
        }
    }
}

/// Field path of a tag's holder list
pub fn tag_path(tag: &str) -> String {
    format!("{LOCK_FIELD}.{tag}")
}

/// Clause requiring `tag` to have no live holder at `reference`
///
/// Without a timeout the tag never goes stale, so only an absent or empty
/// holder list counts as free.
pub fn tag_free(tag: &str, timeout: Option<Duration>, reference: EpochMillis) -> Predicate {
    let path = tag_path(tag);
    let mut alternatives = vec![Predicate::missing(&path), Predicate::size(&path, 0)];
    if let Some(timeout) = timeout {
        let cutoff = reference.saturating_sub(duration_millis(timeout));
        alternatives.push(Predicate::negate(Predicate::elem_match(
            &path,
            Predicate::gt("timestamp", cutoff),
        )));
    }
    Predicate::any(alternatives)
}

/// Augment `base` so it only matches while every tag `tag` relates to under
/// `lock_type` is free at `reference`
///
/// A resource without any lock field always qualifies. Returns `base`
/// unchanged when the tag has no relationships of that type.
pub fn augment(
    base: &Predicate,
    tag: &str,
    relationships: &RelationshipGraph,
    timeouts: &Timeouts,
    lock_type: LockType,
    reference: EpochMillis,
) -> Predicate {
    let related = relationships
        .get(tag)
        .map(|r| r.related(lock_type))
        .unwrap_or_default();
    if related.is_empty() {
        return base.clone();
    }

    let all_free = Predicate::And(
        related
            .iter()
            .map(|other| tag_free(other, timeouts.get(other).copied(), reference))
            .collect(),
    );
    let unlocked = Predicate::any(vec![Predicate::missing(LOCK_FIELD), all_free]);

    tracing::trace!(tag, %lock_type, reference, related = ?related, "augmented filter");
    base.clone().and(unlocked)
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
