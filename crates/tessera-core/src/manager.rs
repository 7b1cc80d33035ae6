//! # Entity Manager
//!
//! The read/write gateway to one model's branch.
//!
//! Reads go straight to the model's current state; nothing is cached.
//! Writes (`create`, `set_order`, and the delegated `update`/`delete`) are
//! appended to the model's mutation log and never touch the map or the id
//! array. A manager therefore keeps seeing the same state until a reducer
//! applies the log and the model's state is replaced.
//!
//! Query methods (`filter`, `order_by`, `first`, ...) come from
//! [`QueryCapable`], which the manager implements by building a `QuerySet`
//! over the whole branch and forwarding to it.

use crate::matcher;
use crate::model::{Entity, Model};
use crate::mutation::Mutation;
use crate::ordering::OrderSpec;
use crate::query::{QueryCapable, QuerySet};
use crate::state::EntityMap;
use crate::{EntityId, Record, TesseraError};
use std::fmt;

/// Gateway to one branch. Cheap to construct and `Copy`.
pub struct EntityManager<'a, M: Model> {
    model: &'a M,
}

impl<M: Model> Clone for EntityManager<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Model> Copy for EntityManager<'_, M> {}

impl<M: Model> fmt::Debug for EntityManager<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("model", &self.model.schema().name())
            .finish()
    }
}

impl<'a, M: Model> EntityManager<'a, M> {
    /// Manager over `model`'s branch.
    #[must_use]
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }

    /// The model this manager reads through.
    #[must_use]
    pub fn model(&self) -> &'a M {
        self.model
    }

    // =========================================================================
    // BRANCH PROJECTIONS
    // =========================================================================

    /// The branch's entity map. Borrowed, not copied.
    #[must_use]
    pub fn entity_map(&self) -> &'a EntityMap {
        self.model
            .state()
            .entity_map(self.model.schema().map_name())
    }

    /// The branch's id array. Borrowed, not copied.
    #[must_use]
    pub fn id_array(&self) -> &'a [EntityId] {
        self.model.state().id_array(self.model.schema().arr_name())
    }

    /// The stored record for `id`, or `None` if absent.
    #[must_use]
    pub fn get_id(&self, id: &EntityId) -> Option<&'a Record> {
        self.entity_map().get(id)
    }

    /// A copy of the stored record, optionally with the id attribute merged in.
    #[must_use]
    pub fn plain_entity(&self, id: &EntityId, include_id: bool) -> Option<Record> {
        let stored = self.get_id(id)?;
        Some(if include_id {
            self.model.schema().attach_id(stored, id)
        } else {
            stored.clone()
        })
    }

    /// The id the model's policy would assign next.
    ///
    /// With the default policy: `max(integer ids) + 1`, or `1` when empty.
    #[must_use]
    pub fn next_id(&self) -> EntityId {
        self.model.next_id(self.id_array())
    }

    // =========================================================================
    // QUERY SETS
    // =========================================================================

    /// Query set over the whole branch, in id-array order.
    #[must_use]
    pub fn query_set(&self) -> QuerySet<'a, M> {
        QuerySet::from_checked(*self, self.id_array().to_vec())
    }

    /// Query set over the given ids, in the given order.
    ///
    /// Ids with no record in the branch are dropped.
    #[must_use]
    pub fn query_set_from_ids(&self, ids: impl IntoIterator<Item = EntityId>) -> QuerySet<'a, M> {
        QuerySet::new(*self, ids.into_iter().collect())
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Record a CREATE and return an entity built from `props` as given.
    ///
    /// No id is assigned here. If `props` lacks the id attribute, the reducer
    /// assigns one at apply time; call `next_id` to choose one up front.
    pub fn create(&self, props: Record) -> M::Entity {
        self.model.add_mutation(Mutation::Create(props.clone()));
        <M::Entity as Entity>::from_record(props)
    }

    /// Record an ORDER instruction for the branch.
    ///
    /// The ordering is materialized once, at apply time. CREATE or UPDATE
    /// records appended after it are not reordered retroactively.
    pub fn set_order(&self, spec: impl Into<OrderSpec>) {
        self.model.add_mutation(Mutation::Order(spec.into()));
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Lookup by example.
    ///
    /// - Empty branch: `EmptyCollection`, whatever the lookup holds.
    /// - Lookup holds the id attribute: direct fetch by that id; every other
    ///   key is ignored. An unknown id is `NotFound`.
    /// - Otherwise: scan in id-array order and return the *first* entity whose
    ///   attributes equal every lookup key. Later matches are not checked, so
    ///   this does not enforce uniqueness. No match is `NotFound`.
    pub fn get(&self, lookup: &Record) -> Result<M::Entity, TesseraError> {
        let schema = self.model.schema();
        if self.id_array().is_empty() {
            return Err(TesseraError::EmptyCollection {
                model: schema.name().to_string(),
            });
        }

        let found = match lookup.get(schema.id_attribute()) {
            Some(value) => EntityId::from_value(value).and_then(|id| self.plain_entity(&id, true)),
            None => self
                .query_set()
                .iter_plain()
                .find(|candidate| matcher::matches(lookup, candidate)),
        };

        found
            .map(<M::Entity as Entity>::from_record)
            .ok_or_else(|| {
                tracing::trace!(model = schema.name(), "lookup matched no entity");
                TesseraError::NotFound {
                    model: schema.name().to_string(),
                }
            })
    }
}

impl<'a, M: Model> QueryCapable<'a, M> for EntityManager<'a, M> {
    fn all(&self) -> QuerySet<'a, M> {
        self.query_set()
    }
}

// =============================================================================
// TESTS
// =============================================================================
