//! # Matcher
//!
//! Lookup-by-example predicate shared by `get`, `filter` and `exclude`.

use crate::Record;

/// Whether `candidate` satisfies every attribute in `lookup`.
///
/// Each lookup key must be present on the candidate with an exactly equal
/// value. Comparison is shallow: list values match only when equal as a
/// whole. An empty lookup matches every candidate.
#[must_use]
pub fn matches(lookup: &Record, candidate: &Record) -> bool {
    lookup
        .iter()
        .all(|(key, expected)| candidate.get(key) == Some(expected))
}
