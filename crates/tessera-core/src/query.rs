//! # Query Sets
//!
//! Immutable, chainable views over an ordered subsequence of a branch's ids.
//!
//! - Chain steps (`filter`, `exclude`, `order_by`, `all`) return a new
//!   `QuerySet`; the receiver and the branch are never modified.
//! - Accessors (`first`, `last`, `at`, `iter`) build entities on demand.
//! - `update` and `delete` record mutations; they do not change state.
//!
//! The same operation set is exposed on `EntityManager` through
//! [`QueryCapable`], whose default methods forward to `all()`.

use crate::manager::EntityManager;
use crate::matcher;
use crate::model::{Entity, Model};
use crate::mutation::Mutation;
use crate::ordering::OrderSpec;
use crate::{EntityId, Record, TesseraError};
use std::fmt;

// =============================================================================
// PREDICATE
// =============================================================================

/// Selection rule for `filter` and `exclude`.
pub enum Predicate<'p> {
    /// Lookup by example: every key must be present with an equal value.
    Lookup(Record),
    /// Arbitrary test over the plain record (id attribute included).
    Func(Box<dyn Fn(&Record) -> bool + 'p>),
}

impl<'p> Predicate<'p> {
    /// Predicate from a closure.
    pub fn func(f: impl Fn(&Record) -> bool + 'p) -> Self {
        Self::Func(Box::new(f))
    }

    /// Whether `record` satisfies the predicate.
    #[must_use]
    pub fn test(&self, record: &Record) -> bool {
        match self {
            Self::Lookup(lookup) => matcher::matches(lookup, record),
            Self::Func(f) => f(record),
        }
    }
}

impl From<Record> for Predicate<'_> {
    fn from(lookup: Record) -> Self {
        Self::Lookup(lookup)
    }
}

impl fmt::Debug for Predicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup(lookup) => f.debug_tuple("Lookup").field(lookup).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

// =============================================================================
// QUERY SET
// =============================================================================

/// An ordered subsequence of a branch's ids.
///
/// Every id in a query set has a record: query sets are built from the
/// branch (or filtered against it), and the model stays borrowed for as long
/// as the query set lives, so the state cannot change underneath it.
pub struct QuerySet<'a, M: Model> {
    manager: EntityManager<'a, M>,
    ids: Vec<EntityId>,
}

impl<'a, M: Model> QuerySet<'a, M> {
    /// A query set over `ids`, in the given order.
    ///
    /// Ids with no record in the branch are dropped.
    #[must_use]
    pub fn new(manager: EntityManager<'a, M>, ids: Vec<EntityId>) -> Self {
        let map = manager.entity_map();
        let ids = ids.into_iter().filter(|id| map.contains_key(id)).collect();
        Self::from_checked(manager, ids)
    }

    /// A query set over ids already known to be in the branch.
    pub(crate) fn from_checked(manager: EntityManager<'a, M>, ids: Vec<EntityId>) -> Self {
        Self { manager, ids }
    }

    /// The ids, in query-set order.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// The manager this query set reads through.
    #[must_use]
    pub fn manager(&self) -> EntityManager<'a, M> {
        self.manager
    }

    /// Number of ids.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Whether any id is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.ids.is_empty()
    }

    /// An equal copy.
    #[must_use]
    pub fn all(&self) -> Self {
        Self::from_checked(self.manager, self.ids.clone())
    }

    /// Ids whose plain records satisfy `predicate`, in current order.
    ///
    /// Lookups collect every match; there is no id fast path here.
    #[must_use]
    pub fn filter<'p>(&self, predicate: impl Into<Predicate<'p>>) -> Self {
        self.select(&predicate.into(), true)
    }

    /// Ids whose plain records do not satisfy `predicate`, in current order.
    #[must_use]
    pub fn exclude<'p>(&self, predicate: impl Into<Predicate<'p>>) -> Self {
        self.select(&predicate.into(), false)
    }

    fn select(&self, predicate: &Predicate<'_>, keep: bool) -> Self {
        let ids = self
            .rows()
            .filter(|(_, record)| predicate.test(record) == keep)
            .map(|(id, _)| id.clone())
            .collect();
        Self::from_checked(self.manager, ids)
    }

    /// Ids reordered by `spec`. Stable: equal records keep their order.
    #[must_use]
    pub fn order_by(&self, spec: impl Into<OrderSpec>) -> Self {
        let spec = spec.into();
        let mut rows: Vec<(&EntityId, Record)> = self.rows().collect();
        rows.sort_by(|a, b| spec.compare(&a.1, &b.1));
        Self::from_checked(self.manager, rows.into_iter().map(|(id, _)| id.clone()).collect())
    }

    /// Entity at `index` (zero-based).
    pub fn at(&self, index: usize) -> Result<M::Entity, TesseraError> {
        let out_of_range = || TesseraError::OutOfRange {
            index,
            len: self.ids.len(),
        };
        let id = self.ids.get(index).ok_or_else(out_of_range)?;
        self.manager
            .plain_entity(id, true)
            .map(<M::Entity as Entity>::from_record)
            .ok_or_else(out_of_range)
    }

    /// First entity.
    pub fn first(&self) -> Result<M::Entity, TesseraError> {
        self.at(0)
    }

    /// Last entity.
    pub fn last(&self) -> Result<M::Entity, TesseraError> {
        match self.ids.len() {
            0 => Err(TesseraError::OutOfRange { index: 0, len: 0 }),
            len => self.at(len - 1),
        }
    }

    /// Record one DELETE per id.
    pub fn delete(&self) {
        self.manager
            .model()
            .add_mutations(self.ids.iter().cloned().map(Mutation::Delete));
    }

    /// Record one UPDATE per id, each carrying `changes`.
    ///
    /// The reducer merges shallowly: top-level attributes are replaced.
    pub fn update(&self, changes: Record) {
        self.manager
            .model()
            .add_mutations(self.ids.iter().map(|id| Mutation::Update {
                id: id.clone(),
                changes: changes.clone(),
            }));
    }

    /// Plain records (id attribute included), eagerly.
    #[must_use]
    pub fn to_plain(&self) -> Vec<Record> {
        self.iter_plain().collect()
    }

    /// Plain records (id attribute included), lazily.
    pub fn iter_plain(&self) -> impl Iterator<Item = Record> + '_ {
        self.rows().map(|(_, record)| record)
    }

    /// Entities, lazily.
    pub fn iter(&self) -> impl Iterator<Item = M::Entity> + '_ {
        self.iter_plain().map(<M::Entity as Entity>::from_record)
    }

    fn rows(&self) -> impl Iterator<Item = (&EntityId, Record)> + '_ {
        self.ids
            .iter()
            .filter_map(|id| Some((id, self.manager.plain_entity(id, true)?)))
    }
}

impl<M: Model> Clone for QuerySet<'_, M> {
    fn clone(&self) -> Self {
        self.all()
    }
}

impl<M: Model> PartialEq for QuerySet<'_, M> {
    /// Same model and same id sequence.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.manager.model(), other.manager.model()) && self.ids == other.ids
    }
}

impl<M: Model> fmt::Debug for QuerySet<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("model", &self.manager.model().schema().name())
            .field("ids", &self.ids)
            .finish()
    }
}

// =============================================================================
// SHARED QUERY SURFACE
// =============================================================================

/// The query operations shared by `EntityManager` and `QuerySet`.
///
/// Implementors provide `all()`; every other method builds that query set and
/// forwards to it.
pub trait QueryCapable<'a, M: Model + 'a> {
    /// Query set over everything this value covers.
    fn all(&self) -> QuerySet<'a, M>;

    /// See [`QuerySet::filter`].
    fn filter<'p>(&self, predicate: impl Into<Predicate<'p>>) -> QuerySet<'a, M> {
        self.all().filter(predicate)
    }

    /// See [`QuerySet::exclude`].
    fn exclude<'p>(&self, predicate: impl Into<Predicate<'p>>) -> QuerySet<'a, M> {
        self.all().exclude(predicate)
    }

    /// See [`QuerySet::order_by`].
    fn order_by(&self, spec: impl Into<OrderSpec>) -> QuerySet<'a, M> {
        self.all().order_by(spec)
    }

    /// See [`QuerySet::exists`].
    fn exists(&self) -> bool {
        self.all().exists()
    }

    /// See [`QuerySet::count`].
    fn count(&self) -> usize {
        self.all().count()
    }

    /// See [`QuerySet::first`].
    fn first(&self) -> Result<M::Entity, TesseraError> {
        self.all().first()
    }

    /// See [`QuerySet::last`].
    fn last(&self) -> Result<M::Entity, TesseraError> {
        self.all().last()
    }

    /// See [`QuerySet::at`].
    fn at(&self, index: usize) -> Result<M::Entity, TesseraError> {
        self.all().at(index)
    }

    /// See [`QuerySet::delete`].
    fn delete(&self) {
        self.all().delete();
    }

    /// See [`QuerySet::update`].
    fn update(&self, changes: Record) {
        self.all().update(changes);
    }

    /// See [`QuerySet::to_plain`].
    fn to_plain(&self) -> Vec<Record> {
        self.all().to_plain()
    }
}

impl<'a, M: Model> QueryCapable<'a, M> for QuerySet<'a, M> {
    fn all(&self) -> QuerySet<'a, M> {
        QuerySet::all(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Schema, Table};
    use crate::mutation::MutationKind;
    use crate::state::StateTree;
    use crate::Value;

    fn flags() -> Table {
        let schema = Schema::new("flag");
        let rows = [(1, true, "c"), (2, false, "a"), (3, true, "b"), (4, false, "a")];
        let map = rows
            .iter()
            .map(|&(id, active, name)| {
                (
                    EntityId::Int(id),
                    Record::new().with("active", active).with("name", name),
                )
            })
            .collect();
        let ids = rows.iter().map(|&(id, _, _)| EntityId::Int(id)).collect();

        let mut state = StateTree::new();
        state
            .insert_branch(schema.map_name(), schema.arr_name(), map, ids)
            .expect("branch");
        Table::with_state(schema, state)
    }

    fn int_ids(qs: &QuerySet<'_, Table>) -> Vec<i64> {
        qs.ids().iter().filter_map(EntityId::as_int).collect()
    }

    #[test]
    fn new_drops_ids_without_records() {
        let table = flags();
        let qs = QuerySet::new(table.manager(), vec![EntityId::Int(99), EntityId::Int(3)]);

        assert_eq!(qs.ids(), &[EntityId::Int(3)]);
        assert_eq!(qs.count(), qs.to_plain().len());
        assert_eq!(qs.first().expect("first").get("id"), Some(&Value::Int(3)));

        let none = QuerySet::new(table.manager(), vec![EntityId::Int(99)]);
        assert!(!none.exists());
        assert_eq!(none.first(), Err(TesseraError::OutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn filter_keeps_original_order() {
        let table = flags();
        let qs = table.manager().query_set().filter(Record::new().with("active", true));
        assert_eq!(int_ids(&qs), vec![1, 3]);
    }

    #[test]
    fn exclude_is_complement_of_filter() {
        let table = flags();
        let qs = table.manager().query_set().exclude(Record::new().with("active", true));
        assert_eq!(int_ids(&qs), vec![2, 4]);
    }

    #[test]
    fn filter_with_closure_sees_id_attribute() {
        let table = flags();
        let qs = table
            .manager()
            .query_set()
            .filter(Predicate::func(|r| r.get("id").and_then(Value::as_int) > Some(2)));
        assert_eq!(int_ids(&qs), vec![3, 4]);
    }

    #[test]
    fn filter_on_id_is_plain_equality() {
        let table = flags();
        let qs = table.manager().query_set().filter(Record::new().with("id", 2));
        assert_eq!(int_ids(&qs), vec![2]);
    }

    #[test]
    fn order_by_is_stable() {
        let table = flags();
        let qs = table.manager().query_set().order_by("name");
        // 2 and 4 share name "a" and keep their relative order.
        assert_eq!(int_ids(&qs), vec![2, 4, 3, 1]);
    }

    #[test]
    fn order_by_attribute_list() {
        let table = flags();
        let qs = table.manager().query_set().order_by(["active", "name"]);
        assert_eq!(int_ids(&qs), vec![2, 4, 3, 1]);
    }

    #[test]
    fn chaining_never_mutates_the_receiver() {
        let table = flags();
        let base = table.manager().query_set();
        let _ = base.filter(Record::new().with("active", false)).order_by("name");
        assert_eq!(int_ids(&base), vec![1, 2, 3, 4]);
        assert!(table.mutations().is_empty());
    }

    #[test]
    fn all_is_equal_but_distinct() {
        let table = flags();
        let manager = table.manager();
        let a = manager.all();
        let b = manager.all();
        assert_eq!(a, b);
        assert!(!std::ptr::eq(&a, &b));
        assert!(!std::ptr::eq(a.ids().as_ptr(), b.ids().as_ptr()));
    }

    #[test]
    fn positional_access() {
        let table = flags();
        let qs = table.manager().query_set();

        assert_eq!(qs.first().expect("first").get("id"), Some(&Value::Int(1)));
        assert_eq!(qs.last().expect("last").get("id"), Some(&Value::Int(4)));
        assert_eq!(qs.at(2).expect("at").get("name"), Some(&Value::from("b")));
        assert_eq!(
            qs.at(4),
            Err(TesseraError::OutOfRange { index: 4, len: 4 })
        );
    }

    #[test]
    fn positional_access_on_empty_fails() {
        let table = flags();
        let empty = table.manager().query_set().filter(Record::new().with("name", "zzz"));
        assert!(!empty.exists());
        assert!(matches!(empty.first(), Err(TesseraError::OutOfRange { .. })));
        assert!(matches!(empty.last(), Err(TesseraError::OutOfRange { .. })));
    }

    #[test]
    fn delete_records_one_mutation_per_id() {
        let table = flags();
        let manager = table.manager();
        manager.query_set_from_ids([EntityId::Int(2), EntityId::Int(4)]).delete();

        assert_eq!(
            table.mutations().snapshot(),
            vec![
                Mutation::Delete(EntityId::Int(2)),
                Mutation::Delete(EntityId::Int(4)),
            ]
        );
        assert_eq!(manager.id_array().len(), 4);
        assert!(manager.get_id(&EntityId::Int(2)).is_some());
    }

    #[test]
    fn update_records_changes_per_id() {
        let table = flags();
        let changes = Record::new().with("active", false);
        table
            .manager()
            .filter(Record::new().with("active", true))
            .update(changes.clone());

        let log = table.mutations().snapshot();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|m| m.kind() == MutationKind::Update));
        assert_eq!(
            log[0],
            Mutation::Update {
                id: EntityId::Int(1),
                changes
            }
        );
    }

    #[test]
    fn to_plain_includes_ids_in_order() {
        let table = flags();
        let plain = table.manager().order_by("name").to_plain();
        let ids: Vec<_> = plain.iter().filter_map(|r| r.get("id").cloned()).collect();
        assert_eq!(
            ids,
            vec![Value::Int(2), Value::Int(4), Value::Int(3), Value::Int(1)]
        );
    }

    #[test]
    fn trait_methods_on_query_set_match_inherent() {
        let table = flags();
        let qs = table.manager().query_set();
        let via_trait = QueryCapable::filter(&qs, Record::new().with("active", true));
        assert_eq!(via_trait, qs.filter(Record::new().with("active", true)));
        assert_eq!(QueryCapable::count(&qs), 4);
    }
}
