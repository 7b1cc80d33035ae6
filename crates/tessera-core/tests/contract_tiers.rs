//! # Contract Tier Tests (T0-T3)
//!
//! If ANY tier fails, the store is INVALID.
//!
//! ## Tiers
//! - T0: Lookup Semantics
//! - T1: Deferred Writes
//! - T2: Query Set Chaining
//! - T3: Apply Contract

use tessera_core::{
    Entity, EntityId, Model, Mutation, MutationLog, OrderSpec, QueryCapable, Record, Schema,
    StateTree, Table, TesseraError, Value,
};

/// Build a table whose branch holds `rows` in the given order.
fn seeded(name: &str, rows: Vec<Record>) -> Table {
    let mut table: Table = Table::new(Schema::new(name));
    table.add_mutations(rows.into_iter().map(Mutation::Create));
    table.commit();
    table
}

fn people() -> Table {
    seeded(
        "person",
        vec![
            Record::new().with("id", 1).with("name", "a").with("active", true),
            Record::new().with("id", 2).with("name", "x").with("active", false),
            Record::new().with("id", 3).with("name", "x").with("active", true),
        ],
    )
}

fn ids_of(records: &[Record]) -> Vec<Value> {
    records.iter().filter_map(|r| r.get("id").cloned()).collect()
}

// =============================================================================
// TIER T0: LOOKUP SEMANTICS
// =============================================================================

mod t0_lookup {
    use super::*;

    /// T0.1: The id attribute short-circuits every other lookup key.
    #[test]
    fn id_lookup_ignores_mismatched_keys() {
        let table = people();
        let found = table
            .manager()
            .get(&Record::new().with("id", 3).with("name", "mismatch"))
            .expect("found by id");
        assert_eq!(found.get("id"), Some(&Value::Int(3)));
    }

    /// T0.2: Attribute lookup returns the first match in id-array order.
    #[test]
    fn attribute_lookup_returns_first_match() {
        let table = seeded(
            "person",
            vec![
                Record::new().with("id", 1).with("name", "a"),
                Record::new().with("id", 2).with("name", "x"),
            ],
        );
        let found = table
            .manager()
            .get(&Record::new().with("name", "x"))
            .expect("found");
        assert_eq!(found.get("id"), Some(&Value::Int(2)));
    }

    /// T0.3: Empty branch fails before the lookup is inspected.
    #[test]
    fn empty_branch_is_empty_collection() {
        let table: Table = Table::new(Schema::new("person"));
        for lookup in [
            Record::new(),
            Record::new().with("id", 1),
            Record::new().with("name", "x"),
        ] {
            assert!(matches!(
                table.manager().get(&lookup),
                Err(TesseraError::EmptyCollection { .. })
            ));
        }
    }

    /// T0.4: No match on a populated branch is NotFound.
    #[test]
    fn no_match_is_not_found() {
        let table = people();
        let result = table.manager().get(&Record::new().with("name", "zzz"));
        assert!(matches!(result, Err(TesseraError::NotFound { .. })));
    }

    /// T0.5: Matching is exact; no coercion between value kinds.
    #[test]
    fn lookup_does_not_coerce() {
        let table = people();
        let result = table.manager().get(&Record::new().with("active", 1));
        assert!(matches!(result, Err(TesseraError::NotFound { .. })));
    }
}

// =============================================================================
// TIER T1: DEFERRED WRITES
// =============================================================================

mod t1_deferred_writes {
    use super::*;

    /// T1.1: create records one CREATE and leaves the branch untouched.
    #[test]
    fn create_only_appends() {
        let table = people();
        let manager = table.manager();
        let map_before = manager.entity_map().clone();
        let ids_before = manager.id_array().to_vec();

        let entity = manager.create(Record::new().with("name", "new"));

        assert_eq!(entity, Record::new().with("name", "new"));
        assert!(!entity.contains_key("id"));
        assert_eq!(manager.entity_map(), &map_before);
        assert_eq!(manager.id_array(), ids_before.as_slice());
        assert_eq!(
            table.mutations().snapshot(),
            vec![Mutation::Create(Record::new().with("name", "new"))]
        );
    }

    /// T1.2: delete records DELETEs for exactly the query set's ids.
    #[test]
    fn delete_only_appends() {
        let table = seeded(
            "n",
            (1..=4).map(|n| Record::new().with("id", n)).collect(),
        );
        let manager = table.manager();
        manager
            .query_set_from_ids([EntityId::Int(2), EntityId::Int(4)])
            .delete();

        let targets: Vec<_> = table
            .mutations()
            .snapshot()
            .into_iter()
            .filter_map(|m| match m {
                Mutation::Delete(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![EntityId::Int(2), EntityId::Int(4)]);
        assert!(manager.get_id(&EntityId::Int(2)).is_some());
        assert!(manager.get_id(&EntityId::Int(4)).is_some());
    }

    /// T1.3: Two managers over the same model see the same snapshot.
    #[test]
    fn managers_share_unapplied_view() {
        let table = people();
        let first = table.manager();
        let second = table.manager();

        first.filter(Record::new().with("active", true)).update(Record::new().with("active", false));

        assert_eq!(first.to_plain(), second.to_plain());
        assert_eq!(second.filter(Record::new().with("active", true)).count(), 2);
        assert_eq!(table.mutations().len(), 2);
    }

    /// T1.4: create does not assign ids; next_id is the explicit way.
    #[test]
    fn create_does_not_assign_ids() {
        let table = people();
        let manager = table.manager();
        let id = manager.next_id();
        assert_eq!(id, EntityId::Int(4));

        let explicit = manager.create(Record::new().with("id", id.clone()).with("name", "n"));
        assert_eq!(explicit.get("id"), Some(&id.to_value()));
    }
}

// =============================================================================
// TIER T2: QUERY SET CHAINING
// =============================================================================

mod t2_query_sets {
    use super::*;

    /// T2.1: filter collects every match in original order.
    #[test]
    fn filter_by_lookup() {
        let table = people();
        let qs = table.manager().filter(Record::new().with("active", true));
        assert_eq!(qs.ids(), &[EntityId::Int(1), EntityId::Int(3)]);
    }

    /// T2.2: order_by is stable for ties.
    #[test]
    fn order_by_is_stable() {
        let table = seeded(
            "p",
            vec![
                Record::new().with("id", 1).with("name", "b"),
                Record::new().with("id", 2).with("name", "a"),
                Record::new().with("id", 3).with("name", "b"),
                Record::new().with("id", 4).with("name", "a"),
            ],
        );
        let plain = table.manager().order_by("name").to_plain();
        assert_eq!(
            ids_of(&plain),
            vec![Value::Int(2), Value::Int(4), Value::Int(1), Value::Int(3)]
        );
    }

    /// T2.3: all() twice gives equal but separate query sets.
    #[test]
    fn all_twice_is_equal_not_identical() {
        let table = people();
        let manager = table.manager();
        let a = manager.all();
        let b = manager.all();
        assert_eq!(a, b);
        assert!(!std::ptr::eq(a.ids().as_ptr(), b.ids().as_ptr()));
    }

    /// T2.4: Chains compose and positional access follows the chain order.
    #[test]
    fn chained_positional_access() {
        let table = people();
        let qs = table
            .manager()
            .exclude(Record::new().with("name", "a"))
            .order_by(OrderSpec::by(|a, b| b.get("id").cmp(&a.get("id"))));

        assert_eq!(qs.count(), 2);
        assert_eq!(qs.first().expect("first").get("id"), Some(&Value::Int(3)));
        assert_eq!(qs.last().expect("last").get("id"), Some(&Value::Int(2)));
        assert_eq!(
            qs.at(2).err(),
            Some(TesseraError::OutOfRange { index: 2, len: 2 })
        );
    }

    /// T2.5: Typed entities are built through the model's entity type.
    #[test]
    fn typed_entities() {
        #[derive(Debug, PartialEq)]
        struct Person {
            id: Option<i64>,
            name: String,
        }

        impl Entity for Person {
            fn from_record(record: Record) -> Self {
                Self {
                    id: record.get("id").and_then(Value::as_int),
                    name: record
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                }
            }
        }

        let mut table: Table<Person> = Table::new(Schema::new("person"));
        let created = table.manager().create(Record::new().with("name", "Ada"));
        assert_eq!(
            created,
            Person {
                id: None,
                name: "Ada".to_string()
            }
        );

        table.commit();
        let stored = table.manager().first().expect("first");
        assert_eq!(stored.id, Some(1));
        assert_eq!(stored.name, "Ada");
        assert_eq!(
            stored,
            Person {
                id: Some(1),
                name: "Ada".to_string()
            }
        );
    }
}

// =============================================================================
// TIER T3: APPLY CONTRACT
// =============================================================================

mod t3_apply {
    use super::*;
    use std::cell::Cell;

    /// A model with text ids and its own id policy.
    struct Slugged {
        schema: Schema,
        state: StateTree,
        log: MutationLog,
        counter: Cell<u32>,
    }

    impl Model for Slugged {
        type Entity = Record;

        fn schema(&self) -> &Schema {
            &self.schema
        }

        fn state(&self) -> &StateTree {
            &self.state
        }

        fn mutations(&self) -> &MutationLog {
            &self.log
        }

        fn next_id(&self, _ids: &[EntityId]) -> EntityId {
            let n = self.counter.get() + 1;
            self.counter.set(n);
            EntityId::Text(format!("tag-{n}"))
        }
    }

    /// T3.1: Applied state keeps the map/array bijection.
    #[test]
    fn apply_preserves_bijection() {
        let mut table = people();
        let manager = table.manager();
        manager.create(Record::new().with("name", "d"));
        manager.filter(Record::new().with("name", "x")).delete();
        manager.create(Record::new().with("id", 1).with("name", "dup"));
        table.commit();

        let schema = table.schema();
        table
            .state()
            .branch(schema.map_name(), schema.arr_name())
            .verify()
            .expect("bijection");
        assert_eq!(
            table.manager().id_array(),
            &[EntityId::Int(1), EntityId::Int(4)]
        );
    }

    /// T3.2: Custom id policy is consulted for CREATEs without an id.
    #[test]
    fn custom_id_policy() {
        let model = Slugged {
            schema: Schema::new("tag").with_id_attribute("slug"),
            state: StateTree::new(),
            log: MutationLog::new(),
            counter: Cell::new(0),
        };
        let manager = tessera_core::EntityManager::new(&model);
        manager.create(Record::new().with("label", "rust"));
        manager.create(Record::new().with("slug", "manual").with("label", "go"));

        let next = tessera_core::apply(&model, &model.mutations().drain());
        assert_eq!(
            next.id_array("tagIds"),
            &[EntityId::from("tag-1"), EntityId::from("manual")]
        );

        let model = Slugged { state: next, ..model };
        let found = tessera_core::EntityManager::new(&model)
            .get(&Record::new().with("label", "go"))
            .expect("found");
        assert_eq!(found.get("slug"), Some(&Value::from("manual")));
    }

    /// T3.3: The log survives a JSON round trip and replays identically.
    #[test]
    fn replay_from_wire_form() {
        let mut source = people();
        let manager = source.manager();
        manager.create(Record::new().with("name", "z"));
        manager.filter(Record::new().with("active", false)).update(Record::new().with("active", true));
        manager.set_order(["name"]);
        let json = source.mutations().to_json().expect("to_json");
        source.commit();

        let mut replica = people();
        let replayed = MutationLog::from_json(&json).expect("from_json");
        replica.add_mutations(replayed.drain());
        replica.commit();

        assert_eq!(source.manager().to_plain(), replica.manager().to_plain());
    }
}
