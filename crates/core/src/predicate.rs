// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document predicates
//!
//! A small typed filter language over JSON documents. Stores translate it to
//! their native query form; [`Predicate::matches`] is the reference semantics
//! used by the in-memory store.
//!
//! Field paths are dotted (`lock.build`) and resolve through nested objects
//! only. Arrays are never traversed implicitly: use [`Predicate::ElemMatch`]
//! to look inside one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A boolean condition on a document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Field equals value (or, for an array field, contains an equal element)
    Eq { path: String, value: Value },
    /// Field is present (`exists: true`) or absent (`exists: false`)
    Exists { path: String, exists: bool },
    /// Integer field is less than or equal to `value`
    Lte { path: String, value: i64 },
    /// Integer field is strictly greater than `value`
    Gt { path: String, value: i64 },
    /// Array field has exactly `len` elements
    Size { path: String, len: usize },
    /// Some element of the array field satisfies the inner predicate
    ElemMatch {
        path: String,
        predicate: Box<Predicate>,
    },
    Not(Box<Predicate>),
    /// All clauses hold; empty is true
    And(Vec<Predicate>),
    /// At least one clause holds; empty is false
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Predicate matching every document
    pub fn always() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Predicate::Exists {
            path: path.into(),
            exists: true,
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        Predicate::Exists {
            path: path.into(),
            exists: false,
        }
    }

    pub fn lte(path: impl Into<String>, value: i64) -> Self {
        Predicate::Lte {
            path: path.into(),
            value,
        }
    }

    pub fn gt(path: impl Into<String>, value: i64) -> Self {
        Predicate::Gt {
            path: path.into(),
            value,
        }
    }

    pub fn size(path: impl Into<String>, len: usize) -> Self {
        Predicate::Size {
            path: path.into(),
            len,
        }
    }

    pub fn elem_match(path: impl Into<String>, predicate: Predicate) -> Self {
        Predicate::ElemMatch {
            path: path.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn negate(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn any(clauses: Vec<Predicate>) -> Self {
        Predicate::Or(clauses)
    }

    /// Conjunction of `self` and `other`
    ///
    /// Nested `And` nodes are flattened into one clause list; every other node,
    /// including a top-level `Or` on either side, is kept as its own clause.
    /// The result is equivalent regardless of argument order.
    pub fn and(self, other: Predicate) -> Predicate {
        let mut clauses = self.into_conjuncts();
        clauses.extend(other.into_conjuncts());
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Predicate::And(clauses)
        }
    }

    fn into_conjuncts(self) -> Vec<Predicate> {
        match self {
            Predicate::And(clauses) => clauses
                .into_iter()
                .flat_map(Predicate::into_conjuncts)
                .collect(),
            other => vec![other],
        }
    }

    /// Evaluate against a document
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Predicate::Eq { path, value } => match resolve(document, path) {
                Some(Value::Array(items)) if !value.is_array() => items.contains(value),
                Some(found) => found == value,
                None => false,
            },
            Predicate::Exists { path, exists } => resolve(document, path).is_some() == *exists,
            Predicate::Lte { path, value } => {
                resolve(document, path).and_then(Value::as_i64).is_some_and(|n| n <= *value)
            }
            Predicate::Gt { path, value } => {
                resolve(document, path).and_then(Value::as_i64).is_some_and(|n| n > *value)
            }
            Predicate::Size { path, len } => resolve(document, path)
                .and_then(Value::as_array)
                .is_some_and(|items| items.len() == *len),
            Predicate::ElemMatch { path, predicate } => resolve(document, path)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| predicate.matches(item))),
            Predicate::Not(inner) => !inner.matches(document),
            Predicate::And(clauses) => clauses.iter().all(|c| c.matches(document)),
            Predicate::Or(clauses) => clauses.iter().any(|c| c.matches(document)),
        }
    }
}

/// Resolve a dotted path through nested objects
pub fn resolve<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod tests;
