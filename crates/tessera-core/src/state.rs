//! # State Tree
//!
//! The normalized state every model reads from.
//!
//! A `StateTree` holds named entity maps and named id arrays. One model owns
//! one *branch*: the map stored under its `map_name` and the array stored
//! under its `arr_name`. Each map and array sits behind its own `Rc`, so a
//! reducer that rewrites one branch clones only that branch; every other
//! branch stays shared with the previous tree.
//!
//! ## Branch Invariant
//!
//! For every branch, the keys of the entity map and the entries of the id
//! array are the same set, and the id array holds no duplicates.
//! `BranchRef::verify` checks this.

use crate::{EntityId, Record, TesseraError};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Id to stored record. Stored records exclude the id attribute.
pub type EntityMap = BTreeMap<EntityId, Record>;

/// Ordered ids; defines default iteration order.
pub type IdArray = Vec<EntityId>;

static EMPTY_MAP: EntityMap = BTreeMap::new();
static EMPTY_IDS: IdArray = Vec::new();

/// Immutable, copy-on-write state tree.
#[derive(Debug, Clone, Default)]
pub struct StateTree {
    maps: BTreeMap<String, Rc<EntityMap>>,
    arrays: BTreeMap<String, Rc<IdArray>>,
}

impl StateTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity map stored under `name`, or an empty map.
    #[must_use]
    pub fn entity_map(&self, name: &str) -> &EntityMap {
        self.maps.get(name).map_or(&EMPTY_MAP, |m| &**m)
    }

    /// The id array stored under `name`, or an empty array.
    #[must_use]
    pub fn id_array(&self, name: &str) -> &[EntityId] {
        self.arrays.get(name).map_or(&EMPTY_IDS, |a| &**a)
    }

    /// Borrow one branch.
    #[must_use]
    pub fn branch<'a>(&'a self, map_name: &str, arr_name: &str) -> BranchRef<'a> {
        BranchRef {
            map: self.entity_map(map_name),
            ids: self.id_array(arr_name),
        }
    }

    /// Install a branch, replacing whatever was stored under those names.
    ///
    /// The branch is verified first; a map and array that disagree are rejected.
    pub fn insert_branch(
        &mut self,
        map_name: &str,
        arr_name: &str,
        map: EntityMap,
        ids: IdArray,
    ) -> Result<(), TesseraError> {
        BranchRef {
            map: &map,
            ids: &ids,
        }
        .verify()?;
        self.maps.insert(map_name.to_string(), Rc::new(map));
        self.arrays.insert(arr_name.to_string(), Rc::new(ids));
        Ok(())
    }

    /// Mutable access to one branch, cloning it first if it is shared.
    pub(crate) fn branch_mut(
        &mut self,
        map_name: &str,
        arr_name: &str,
    ) -> (&mut EntityMap, &mut IdArray) {
        let map = Rc::make_mut(self.maps.entry(map_name.to_string()).or_default());
        let ids = Rc::make_mut(self.arrays.entry(arr_name.to_string()).or_default());
        (map, ids)
    }

    /// Whether both trees share the same allocation for the map under `name`.
    #[must_use]
    pub fn shares_map(&self, other: &Self, name: &str) -> bool {
        match (self.maps.get(name), other.maps.get(name)) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Borrowed view of one branch.
#[derive(Debug, Clone, Copy)]
pub struct BranchRef<'a> {
    /// Id to stored record.
    pub map: &'a EntityMap,
    /// Ordered ids.
    pub ids: &'a [EntityId],
}

impl BranchRef<'_> {
    /// Check the map/array bijection.
    pub fn verify(&self) -> Result<(), TesseraError> {
        let mut seen = BTreeSet::new();
        for id in self.ids {
            if !seen.insert(id) {
                return Err(TesseraError::BrokenInvariant(format!(
                    "id {id} appears twice in the id array"
                )));
            }
            if !self.map.contains_key(id) {
                return Err(TesseraError::BrokenInvariant(format!(
                    "id {id} has no record in the entity map"
                )));
            }
        }
        if let Some(orphan) = self.map.keys().find(|id| !seen.contains(id)) {
            return Err(TesseraError::BrokenInvariant(format!(
                "record {orphan} is missing from the id array"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
