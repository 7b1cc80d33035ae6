//! # Primitives
//!
//! Fixed constants for tessera.
//!
//! These are compiled into the binary and immutable at runtime. Schemas may
//! override the naming defaults; the id policy can be replaced per model
//! through `Model::next_id`.

use crate::EntityId;
use std::collections::BTreeSet;

/// Attribute name treated as the primary key when a schema names none.
pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

/// Id returned by the default id policy when a branch holds no integer ids.
///
/// - `next_id` on an empty branch yields this value instead of failing.
/// - Non-empty branches yield `max(integer ids) + 1`.
pub const FIRST_ID: i64 = 1;

/// Suffix appended to a model name to form its entity-map key.
pub const MAP_NAME_SUFFIX: &str = "ById";

/// Suffix appended to a model name to form its id-array key.
pub const ARR_NAME_SUFFIX: &str = "Ids";

/// Default id policy: one past the largest integer id.
///
/// Text ids do not participate. When the largest id is `i64::MAX` there is no
/// "one past", so the lowest unused id from `FIRST_ID` upwards is returned.
#[must_use]
pub fn next_after_max<'a>(ids: impl IntoIterator<Item = &'a EntityId>) -> EntityId {
    let used: BTreeSet<i64> = ids.into_iter().filter_map(EntityId::as_int).collect();
    let next = match used.last() {
        None => FIRST_ID,
        Some(max) => max
            .checked_add(1)
            .or_else(|| (FIRST_ID..=i64::MAX).find(|n| !used.contains(n)))
            .unwrap_or(FIRST_ID),
    };
    EntityId::Int(next)
}
