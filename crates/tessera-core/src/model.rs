//! # Model Layer
//!
//! The schema side of tessera: what a branch is called, which attribute is
//! its primary key, how entities are constructed, and where writes are
//! recorded.
//!
//! - `Entity`: constructs a typed view from a plain record
//! - `Schema`: names for one model's branch and id attribute
//! - `Model`: the contract managers and query sets read through
//! - `Table`: a ready-made `Model` owning its state and mutation log

use crate::manager::EntityManager;
use crate::mutation::{Mutation, MutationLog};
use crate::primitives::{self, ARR_NAME_SUFFIX, DEFAULT_ID_ATTRIBUTE, MAP_NAME_SUFFIX};
use crate::reducer;
use crate::state::StateTree;
use crate::{EntityId, Record};
use std::fmt;
use std::marker::PhantomData;

// =============================================================================
// ENTITY
// =============================================================================

/// A typed, transient view of one record.
///
/// Entities are never stored. They are built on every read and returned by
/// `create` before anything is applied.
pub trait Entity: Sized {
    /// Build the entity from a plain record (usually carrying the id attribute).
    fn from_record(record: Record) -> Self;
}

impl Entity for Record {
    fn from_record(record: Record) -> Self {
        record
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Naming for one model's branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    id_attribute: String,
    map_name: String,
    arr_name: String,
}

impl Schema {
    /// Schema with default naming: id attribute `"id"`, map `"<name>ById"`,
    /// array `"<name>Ids"`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            map_name: format!("{name}{MAP_NAME_SUFFIX}"),
            arr_name: format!("{name}{ARR_NAME_SUFFIX}"),
            name,
        }
    }

    /// Use a different primary-key attribute.
    #[must_use]
    pub fn with_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.id_attribute = attribute.into();
        self
    }

    /// Use a different entity-map key.
    #[must_use]
    pub fn with_map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = map_name.into();
        self
    }

    /// Use a different id-array key.
    #[must_use]
    pub fn with_arr_name(mut self, arr_name: impl Into<String>) -> Self {
        self.arr_name = arr_name.into();
        self
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary-key attribute.
    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    /// Key of the entity map in the state tree.
    #[must_use]
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// Key of the id array in the state tree.
    #[must_use]
    pub fn arr_name(&self) -> &str {
        &self.arr_name
    }

    /// A copy of `record` with `id` merged in under the id attribute.
    #[must_use]
    pub fn attach_id(&self, record: &Record, id: &EntityId) -> Record {
        let mut plain = record.clone();
        plain.insert(self.id_attribute.as_str(), id.to_value());
        plain
    }
}

// =============================================================================
// MODEL CONTRACT
// =============================================================================

/// What an `EntityManager` needs from its model.
///
/// Implementors own the current state and the mutation log. The state must
/// be kept in sync externally: managers read through on every call and hold
/// no cache.
pub trait Model {
    /// Entity type constructed on reads.
    type Entity: Entity;

    /// Naming for this model's branch.
    fn schema(&self) -> &Schema;

    /// The current state tree.
    fn state(&self) -> &StateTree;

    /// The pending mutations.
    fn mutations(&self) -> &MutationLog;

    /// Record one mutation. Every write in the crate goes through here.
    fn add_mutation(&self, mutation: Mutation) {
        tracing::debug!(
            model = self.schema().name(),
            kind = %mutation.kind(),
            pending = self.mutations().len() + 1,
            "mutation recorded"
        );
        self.mutations().push(mutation);
    }

    /// Record several mutations in order.
    fn add_mutations(&self, mutations: impl IntoIterator<Item = Mutation>) {
        for mutation in mutations {
            self.add_mutation(mutation);
        }
    }

    /// Id policy used when a CREATE carries no id.
    ///
    /// Defaults to `max(integer ids) + 1`, or `1` for a branch with no
    /// integer ids. Override for text ids or other schemes.
    fn next_id(&self, ids: &[EntityId]) -> EntityId {
        primitives::next_after_max(ids)
    }
}

// =============================================================================
// TABLE
// =============================================================================

/// A model that owns its state tree and mutation log.
///
/// `E` is the entity type handed out on reads; plain `Record`s by default.
pub struct Table<E = Record> {
    schema: Schema,
    state: StateTree,
    log: MutationLog,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Table<E> {
    /// A table over an empty state tree.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self::with_state(schema, StateTree::new())
    }

    /// A table over an existing state tree.
    #[must_use]
    pub fn with_state(schema: Schema, state: StateTree) -> Self {
        Self {
            schema,
            state,
            log: MutationLog::new(),
            _entity: PhantomData,
        }
    }

    /// Manager for this table's branch.
    #[must_use]
    pub fn manager(&self) -> EntityManager<'_, Self> {
        EntityManager::new(self)
    }

    /// Replace the state, e.g. after an external reducer ran.
    pub fn set_state(&mut self, state: StateTree) {
        self.state = state;
    }

    /// Consume the table, keeping its state.
    #[must_use]
    pub fn into_state(self) -> StateTree {
        self.state
    }

    /// Drain the log through the reference reducer and swap in the result.
    ///
    /// Returns the number of mutations applied.
    pub fn commit(&mut self) -> usize {
        let ops = self.log.drain();
        let next = reducer::apply(self, &ops);
        self.state = next;
        ops.len()
    }
}

impl<E: Entity> Model for Table<E> {
    type Entity = E;

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn state(&self) -> &StateTree {
        &self.state
    }

    fn mutations(&self) -> &MutationLog {
        &self.log
    }
}

impl<E> fmt::Debug for Table<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema)
            .field("pending", &self.log.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationKind;

    #[test]
    fn schema_default_naming() {
        let schema = Schema::new("book");
        assert_eq!(schema.name(), "book");
        assert_eq!(schema.id_attribute(), "id");
        assert_eq!(schema.map_name(), "bookById");
        assert_eq!(schema.arr_name(), "bookIds");
    }

    #[test]
    fn schema_overrides() {
        let schema = Schema::new("book")
            .with_id_attribute("isbn")
            .with_map_name("books")
            .with_arr_name("bookOrder");
        assert_eq!(schema.id_attribute(), "isbn");
        assert_eq!(schema.map_name(), "books");
        assert_eq!(schema.arr_name(), "bookOrder");
    }

    #[test]
    fn attach_id_leaves_source_untouched() {
        let schema = Schema::new("book");
        let stored = Record::new().with("title", "Dune");
        let plain = schema.attach_id(&stored, &EntityId::Int(4));

        assert_eq!(plain.get("id"), Some(&crate::Value::Int(4)));
        assert!(!stored.contains_key("id"));
    }

    #[test]
    fn add_mutations_appends_in_order() {
        let table: Table = Table::new(Schema::new("book"));
        table.add_mutations([
            Mutation::Delete(EntityId::Int(1)),
            Mutation::Create(Record::new()),
        ]);

        let kinds: Vec<_> = table.mutations().snapshot().iter().map(Mutation::kind).collect();
        assert_eq!(kinds, vec![MutationKind::Delete, MutationKind::Create]);
    }

    #[test]
    fn commit_drains_the_log() {
        let mut table: Table = Table::new(Schema::new("book"));
        table.add_mutation(Mutation::Create(Record::new().with("title", "Dune")));

        assert_eq!(table.commit(), 1);
        assert!(table.mutations().is_empty());
        assert_eq!(table.state().id_array("bookIds"), &[EntityId::Int(1)]);
    }
}
