//! # Reference Reducer
//!
//! Applies a model's recorded mutations to its state, producing a new tree.
//!
//! Managers and query sets only record mutations; this is the step that
//! turns them into state. It is a plain function over `&Model` so a host
//! application can swap in its own reducer and keep the same record shapes.
//!
//! ## Semantics
//!
//! - CREATE: the id comes from the payload's id attribute, else from
//!   `Model::next_id`. The id attribute is stripped from the stored record.
//!   A caller-supplied existing id replaces its record in place; a generated
//!   id that is already in use skips the CREATE.
//! - UPDATE: shallow merge into the existing record; unknown ids are skipped.
//! - DELETE: removes the id from both map and array; unknown ids are skipped.
//! - ORDER: stable sort of the id array by plain records, evaluated against
//!   the records as they stand at that point in the sequence.
//!
//! Only the target branch is cloned; every other branch stays shared.

use crate::model::Model;
use crate::mutation::Mutation;
use crate::state::StateTree;
use crate::{EntityId, Record};

/// Apply `ops` to `model`'s branch, returning the next state tree.
///
/// The branch invariant holds on the result whenever it held on the input.
#[must_use]
pub fn apply<M: Model>(model: &M, ops: &[Mutation]) -> StateTree {
    let schema = model.schema();
    let mut next = model.state().clone();
    if ops.is_empty() {
        return next;
    }

    let id_attribute = schema.id_attribute();
    let (map, ids) = next.branch_mut(schema.map_name(), schema.arr_name());

    for op in ops {
        match op {
            Mutation::Create(props) => {
                let mut record = props.clone();
                let explicit = record.remove(id_attribute).and_then(|value| {
                    let id = EntityId::from_value(&value);
                    if id.is_none() {
                        tracing::warn!(
                            model = schema.name(),
                            ?value,
                            "unusable id value in CREATE, assigning one"
                        );
                    }
                    id
                });
                let id = match explicit {
                    Some(id) => id,
                    None => {
                        let id = model.next_id(ids.as_slice());
                        if map.contains_key(&id) {
                            tracing::warn!(
                                model = schema.name(),
                                %id,
                                "id policy returned an id already in use, CREATE skipped"
                            );
                            continue;
                        }
                        id
                    }
                };
                if map.insert(id.clone(), record).is_none() {
                    ids.push(id);
                }
            }
            Mutation::Update { id, changes } => match map.get_mut(id) {
                Some(record) => {
                    let mut changes = changes.clone();
                    changes.remove(id_attribute);
                    record.merge(&changes);
                }
                None => {
                    tracing::warn!(model = schema.name(), %id, "UPDATE for unknown id skipped");
                }
            },
            Mutation::Delete(id) => {
                if map.remove(id).is_some() {
                    ids.retain(|existing| existing != id);
                } else {
                    tracing::trace!(model = schema.name(), %id, "DELETE for unknown id skipped");
                }
            }
            Mutation::Order(spec) => {
                let mut rows: Vec<(EntityId, Record)> = ids
                    .drain(..)
                    .map(|id| {
                        let plain = map
                            .get(&id)
                            .map(|stored| schema.attach_id(stored, &id))
                            .unwrap_or_default();
                        (id, plain)
                    })
                    .collect();
                rows.sort_by(|a, b| spec.compare(&a.1, &b.1));
                ids.extend(rows.into_iter().map(|(id, _)| id));
            }
        }
    }

    tracing::debug!(
        model = schema.name(),
        applied = ops.len(),
        size = ids.len(),
        "mutations applied"
    );
    next
}

// =============================================================================
// TESTS
// =============================================================================
