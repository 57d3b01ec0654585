// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-document update operations

use crate::predicate::Predicate;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A mutation applied to one matched document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Update {
    /// Set the field, creating intermediate objects
    Set { path: String, value: Value },
    /// Append to the array field, creating it when absent
    Push { path: String, value: Value },
    /// Remove every element of the array field matching the predicate
    Pull { path: String, predicate: Predicate },
}

impl Update {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn push(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::Push {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn pull(path: impl Into<String>, predicate: Predicate) -> Self {
        Update::Pull {
            path: path.into(),
            predicate,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Update::Set { path, .. } | Update::Push { path, .. } | Update::Pull { path, .. } => path,
        }
    }

    /// Apply to a document in place, returning whether it changed
    pub fn apply(&self, document: &mut Value) -> Result<bool, StoreError> {
        match self {
            Update::Set { path, value } => {
                let (parent, field) = parent_mut(document, path)?;
                let previous = parent.insert(field.to_string(), value.clone());
                Ok(previous.as_ref() != Some(value))
            }
            Update::Push { path, value } => {
                let (parent, field) = parent_mut(document, path)?;
                let slot = parent
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(items) => {
                        items.push(value.clone());
                        Ok(true)
                    }
                    other => Err(StoreError::InvalidUpdate(format!(
                        "cannot push to non-array field {path} ({})",
                        type_name(other)
                    ))),
                }
            }
            Update::Pull { path, predicate } => match resolve_mut(document, path) {
                Some(Value::Array(items)) => {
                    let before = items.len();
                    items.retain(|item| !predicate.matches(item));
                    Ok(items.len() != before)
                }
                Some(other) => Err(StoreError::InvalidUpdate(format!(
                    "cannot pull from non-array field {path} ({})",
                    type_name(other)
                ))),
                None => Ok(false),
            },
        }
    }
}

/// Walk to the object holding the last path segment, creating objects on the way
fn parent_mut<'a>(
    document: &'a mut Value,
    path: &'a str,
) -> Result<(&'a mut Map<String, Value>, &'a str), StoreError> {
    let (parents, field) = match path.rsplit_once('.') {
        Some((parents, field)) => (Some(parents), field),
        None => (None, path),
    };
    if field.is_empty() {
        return Err(StoreError::InvalidUpdate(format!("empty field in path {path:?}")));
    }

    let mut current = document;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .as_object_mut()
            .ok_or_else(|| not_an_object(path, segment))?
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let parent = current
        .as_object_mut()
        .ok_or_else(|| not_an_object(path, field))?;
    Ok((parent, field))
}

fn resolve_mut<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

fn not_an_object(path: &str, segment: &str) -> StoreError {
    StoreError::InvalidUpdate(format!(
        "cannot traverse into {segment:?} of {path}: parent is not an object"
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
