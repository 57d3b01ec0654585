// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration
//!
//! Defaults are filled in once, when a config is built or deserialized.
//! Coordinators read their settings from the config they were constructed
//! with and never fall back to anything else per call.

use crate::filter::LockType;
use crate::store::{ReadOptions, WriteConcern, WriteOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_COLLECTION: &str = "lock";
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tag {tag:?} lists itself as {lock_type} dependency")]
    SelfRelationship { tag: String, lock_type: LockType },
    #[error("tag {tag:?} (referenced by {referenced_by:?}) has no timeout")]
    MissingTimeout { tag: String, referenced_by: String },
    #[error("invalid tag name {0:?}: must be non-empty, without '.' and not start with '$'")]
    InvalidTag(String),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tags that must be free before a tag can be held
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRelationships {
    /// Checked before the grant is recorded
    #[serde(default)]
    pub cooperative: Vec<String>,
    /// Checked after the grant is recorded
    #[serde(default)]
    pub assertive: Vec<String>,
}

impl TagRelationships {
    pub fn cooperative<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            cooperative: tags.into_iter().map(Into::into).collect(),
            assertive: Vec::new(),
        }
    }

    pub fn assertive<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            cooperative: Vec::new(),
            assertive: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_assertive<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.assertive = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn related(&self, lock_type: LockType) -> &[String] {
        match lock_type {
            LockType::Cooperative => &self.cooperative,
            LockType::Assertive => &self.assertive,
        }
    }
}

/// Tag name to relationships
pub type RelationshipGraph = HashMap<String, TagRelationships>;

/// Tag name to staleness timeout
pub type Timeouts = HashMap<String, Duration>;

/// Configuration for the multi-tag relational lock
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiLockConfig {
    /// Staleness timeout per tag
    #[serde(default, with = "timeout_map")]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub relationships: RelationshipGraph,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub write_concern: WriteConcern,
    /// Budget for every individual store call
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for MultiLockConfig {
    fn default() -> Self {
        Self {
            timeouts: HashMap::new(),
            relationships: HashMap::new(),
            collection: default_collection(),
            write_concern: WriteConcern::default(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl MultiLockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML, filling defaults for omitted fields
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Declare a tag with its timeout and relationships
    pub fn with_tag(
        mut self,
        tag: impl Into<String>,
        timeout: Duration,
        relationships: TagRelationships,
    ) -> Self {
        let tag = tag.into();
        self.timeouts.insert(tag.clone(), timeout);
        self.relationships.insert(tag, relationships);
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = write_concern;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn relationships_of(&self, tag: &str) -> Option<&TagRelationships> {
        self.relationships.get(tag)
    }

    /// Reject graphs the coordinator cannot evaluate
    ///
    /// Self-relationships are refused: a tag's own freshly pushed holder
    /// record would otherwise block it forever. Cycles between distinct tags
    /// are fine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tag in self.timeouts.keys() {
            validate_tag(tag)?;
        }

        for (tag, relationships) in &self.relationships {
            validate_tag(tag)?;
            for lock_type in [LockType::Cooperative, LockType::Assertive] {
                for related in relationships.related(lock_type) {
                    validate_tag(related)?;
                    if related == tag {
                        return Err(ConfigError::SelfRelationship {
                            tag: tag.clone(),
                            lock_type,
                        });
                    }
                    if !self.timeouts.contains_key(related) {
                        return Err(ConfigError::MissingTimeout {
                            tag: related.clone(),
                            referenced_by: tag.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply `overrides` on top of this configuration and validate the result
    pub fn merged(&self, overrides: &LockOverrides) -> Result<Self, ConfigError> {
        let merged = Self {
            timeouts: overrides
                .timeouts
                .clone()
                .unwrap_or_else(|| self.timeouts.clone()),
            relationships: overrides
                .relationships
                .clone()
                .unwrap_or_else(|| self.relationships.clone()),
            collection: overrides
                .collection
                .clone()
                .unwrap_or_else(|| self.collection.clone()),
            write_concern: overrides.write_concern.unwrap_or(self.write_concern),
            timeout: overrides.timeout.unwrap_or(self.timeout),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            write_concern: self.write_concern,
            wtimeout: self.timeout,
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            max_wait: self.timeout,
        }
    }
}

/// Per-call replacements for [`MultiLockConfig`] fields
///
/// Unset fields fall back to the coordinator's own configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LockOverrides {
    pub relationships: Option<RelationshipGraph>,
    pub timeouts: Option<Timeouts>,
    pub collection: Option<String>,
    pub write_concern: Option<WriteConcern>,
    pub timeout: Option<Duration>,
}

impl LockOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relationships(mut self, relationships: RelationshipGraph) -> Self {
        self.relationships = Some(relationships);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Configuration for the single-tag write lock
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteLockConfig {
    /// How long a granted lock stays valid without release
    #[serde(default = "default_lock_timeout", with = "humantime_serde")]
    pub lock_timeout: Duration,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub write_concern: WriteConcern,
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for WriteLockConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            collection: default_collection(),
            write_concern: WriteConcern::default(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl WriteLockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = write_concern;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            write_concern: self.write_concern,
            wtimeout: self.timeout,
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            max_wait: self.timeout,
        }
    }
}

/// Tag names become field path segments under the lock field
pub fn validate_tag(tag: &str) -> Result<(), ConfigError> {
    if tag.is_empty() || tag.contains('.') || tag.starts_with('$') {
        return Err(ConfigError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_operation_timeout() -> Duration {
    DEFAULT_OPERATION_TIMEOUT
}

fn default_lock_timeout() -> Duration {
    DEFAULT_LOCK_TIMEOUT
}

/// humantime durations as map values
mod timeout_map {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        map.iter()
            .map(|(tag, timeout)| (tag, humantime_serde::Serde::from(*timeout)))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, Duration>, D::Error> {
        let raw = HashMap::<String, humantime_serde::Serde<Duration>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(tag, timeout)| (tag, timeout.into_inner()))
            .collect())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
