//! # Core Type Definitions
//!
//! This module contains the value types every other module builds on:
//! - Entity identifiers (`EntityId`)
//! - Attribute values and plain records (`Value`, `Record`)
//! - Error types (`TesseraError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Serialize to plain JSON (no enum tags) so mutation payloads stay readable

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIER
// =============================================================================

/// Identifier of one record inside a branch.
///
/// Ids are either integers or text. Integers sort before text, so a branch
/// mixing both still has a total order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric id, the kind produced by the default id policy.
    Int(i64),
    /// Caller-chosen text id.
    Text(String),
}

impl EntityId {
    /// Convert an attribute value into an id.
    ///
    /// Only `Value::Int` and `Value::Text` name an id; anything else yields `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(Self::Int(*n)),
            Value::Text(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// The id as an attribute value, used when merging it into a record.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::Int(*n),
            Self::Text(s) => Value::Text(s.clone()),
        }
    }

    /// The integer form, if this is a numeric id.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A single attribute value.
///
/// Equality is exact: `Int(1)` never equals `Text("1")` and there is no
/// truthiness coercion. Variant order (`Null < Bool < Int < Text < List`)
/// drives attribute ordering across mixed types.
///
/// There is no floating-point or nested-object variant: JSON holding a
/// fractional number or an object as an attribute value fails to
/// deserialize (and so does a mutation log carrying one).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent or explicitly null attribute.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// UTF-8 text.
    Text(String),
    /// Ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Text content, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integer value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        id.to_value()
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// A plain record: attribute name to value.
///
/// Stored records exclude the id attribute; plain records handed to callers
/// and predicates usually include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace an attribute, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove an attribute, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Look up an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the attribute is present (even if `Null`).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow merge: every attribute of `changes` replaces the one here.
    ///
    /// Nested lists are replaced whole, never merged element-wise.
    pub fn merge(&mut self, changes: &Record) {
        for (key, value) in changes.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in tessera.
///
/// - No silent failures
/// - Use `Result<T, TesseraError>` for fallible operations
/// - The core never panics; every error is recoverable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TesseraError {
    /// A lookup ran against a branch with no ids.
    #[error("{model}: lookup on an empty collection")]
    EmptyCollection {
        /// Model name of the branch.
        model: String,
    },

    /// A lookup found no matching entity.
    #[error("{model}: entity not found")]
    NotFound {
        /// Model name of the branch.
        model: String,
    },

    /// A positional access fell outside the id sequence.
    #[error("index {index} out of range for query set of length {len}")]
    OutOfRange {
        /// Requested position.
        index: usize,
        /// Length of the id sequence.
        len: usize,
    },

    /// A schema declaration is malformed.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A branch violates the map/id-array bijection.
    #[error("Broken branch invariant: {0}")]
    BrokenInvariant(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
