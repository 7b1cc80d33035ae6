//! # Ordering
//!
//! Ordering instructions shared by `QuerySet::order_by` and the ORDER mutation.
//!
//! An `OrderSpec` is one of:
//! - a single attribute name (ascending),
//! - a list of attribute names (lexicographic ascending),
//! - a comparator function over plain records.
//!
//! Callers sort with a stable sort, so records that compare equal keep their
//! relative order. Comparator orderings only exist in-process: they refuse to
//! serialize.

use crate::{Record, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

static NULL: Value = Value::Null;

/// Comparator over plain records.
pub type CompareFn = dyn Fn(&Record, &Record) -> Ordering;

/// A shareable comparator function.
///
/// Two comparators are equal only if they are the same allocation.
#[derive(Clone)]
pub struct Comparator(Rc<CompareFn>);

impl Comparator {
    /// Wrap a comparator closure.
    pub fn new(f: impl Fn(&Record, &Record) -> Ordering + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Compare two records.
    #[must_use]
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        (self.0)(a, b)
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Comparator(..)")
    }
}

impl PartialEq for Comparator {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// How to order entities.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderSpec {
    /// Ascending by one attribute.
    Attribute(String),
    /// Ascending by each attribute in turn; later names break ties.
    Attributes(Vec<String>),
    /// Caller-supplied comparator.
    Comparator(Comparator),
}

impl OrderSpec {
    /// Order with a comparator closure.
    pub fn by(f: impl Fn(&Record, &Record) -> Ordering + 'static) -> Self {
        Self::Comparator(Comparator::new(f))
    }

    /// Compare two plain records under this ordering.
    ///
    /// A missing attribute compares as `Null`, so records lacking the
    /// attribute sort first.
    #[must_use]
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            Self::Attribute(key) => compare_attribute(key, a, b),
            Self::Attributes(keys) => keys
                .iter()
                .map(|key| compare_attribute(key, a, b))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal),
            Self::Comparator(cmp) => cmp.compare(a, b),
        }
    }

    /// Whether this ordering can cross a process boundary.
    #[must_use]
    pub fn is_serializable(&self) -> bool {
        !matches!(self, Self::Comparator(_))
    }
}

fn compare_attribute(key: &str, a: &Record, b: &Record) -> Ordering {
    let left = a.get(key).unwrap_or(&NULL);
    let right = b.get(key).unwrap_or(&NULL);
    left.cmp(right)
}

impl From<&str> for OrderSpec {
    fn from(key: &str) -> Self {
        Self::Attribute(key.to_string())
    }
}

impl From<String> for OrderSpec {
    fn from(key: String) -> Self {
        Self::Attribute(key)
    }
}

impl From<Vec<String>> for OrderSpec {
    fn from(keys: Vec<String>) -> Self {
        Self::Attributes(keys)
    }
}

impl<const N: usize> From<[&str; N]> for OrderSpec {
    fn from(keys: [&str; N]) -> Self {
        Self::Attributes(keys.iter().map(|k| (*k).to_string()).collect())
    }
}

impl From<Comparator> for OrderSpec {
    fn from(cmp: Comparator) -> Self {
        Self::Comparator(cmp)
    }
}

// =============================================================================
// WIRE FORM
// =============================================================================

/// Plain form: a string or a list of strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum OrderRepr {
    One(String),
    Many(Vec<String>),
}

impl Serialize for OrderSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Attribute(key) => serializer.serialize_str(key),
            Self::Attributes(keys) => keys.serialize(serializer),
            Self::Comparator(_) => Err(serde::ser::Error::custom(
                "comparator orderings are not serializable",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for OrderSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match OrderRepr::deserialize(deserializer)? {
            OrderRepr::One(key) => Self::Attribute(key),
            OrderRepr::Many(keys) => Self::Attributes(keys),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
