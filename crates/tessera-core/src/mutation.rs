//! # Mutation Log
//!
//! Writes in tessera are recorded, not applied. Every create, update, delete
//! or reorder becomes a `Mutation` appended to the owning model's
//! `MutationLog`; a reducer later drains the log and produces the next state.
//!
//! Until that happens every reader sees the unmodified state. Nothing in this
//! crate applies a mutation eagerly.
//!
//! ## Wire Form
//!
//! ```json
//! { "type": "CREATE", "payload": { "name": "a" } }
//! { "type": "UPDATE", "payload": { "id": 3, "changes": { "done": true } } }
//! { "type": "DELETE", "payload": 3 }
//! { "type": "ORDER",  "payload": ["priority", "name"] }
//! ```
//!
//! ORDER records carrying a comparator function cannot be serialized.

use crate::ordering::OrderSpec;
use crate::{EntityId, Record, TesseraError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;

/// A queued write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "UPPERCASE")]
pub enum Mutation {
    /// Insert a record. An absent id attribute means the reducer assigns one.
    Create(Record),
    /// Shallow-merge `changes` into the record with `id`.
    Update {
        /// Target record.
        id: EntityId,
        /// Attributes to overwrite.
        changes: Record,
    },
    /// Remove the record with this id.
    Delete(EntityId),
    /// Reorder the id array at apply time.
    Order(OrderSpec),
}

/// The kind of a mutation, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationKind {
    /// `Mutation::Create`
    Create,
    /// `Mutation::Update`
    Update,
    /// `Mutation::Delete`
    Delete,
    /// `Mutation::Order`
    Order,
}

impl MutationKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Order => "ORDER",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Mutation {
    /// The kind of this mutation.
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Create(_) => MutationKind::Create,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete(_) => MutationKind::Delete,
            Self::Order(_) => MutationKind::Order,
        }
    }
}

/// Append-only sequence of mutations owned by a model.
///
/// Appends go through `&self` so that managers and query sets, which only
/// borrow the model, can record writes. Single-threaded by construction
/// (`RefCell`, not `Sync`).
#[derive(Debug, Default)]
pub struct MutationLog {
    records: RefCell<Vec<Mutation>>,
}

impl MutationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one mutation.
    pub fn push(&self, mutation: Mutation) {
        self.records.borrow_mut().push(mutation);
    }

    /// Append several mutations, preserving their order.
    ///
    /// The iterator is drained before the log is borrowed, so it may read the log.
    pub fn extend(&self, mutations: impl IntoIterator<Item = Mutation>) {
        let pending: Vec<Mutation> = mutations.into_iter().collect();
        self.records.borrow_mut().extend(pending);
    }

    /// Number of pending mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether no mutations are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Copy of the pending mutations, leaving the log intact.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Mutation> {
        self.records.borrow().clone()
    }

    /// Take every pending mutation, leaving the log empty.
    pub fn drain(&self) -> Vec<Mutation> {
        self.records.take()
    }

    /// Serialize the pending mutations as a JSON array.
    ///
    /// Fails if any ORDER record carries a comparator function.
    pub fn to_json(&self) -> Result<String, TesseraError> {
        serde_json::to_string(&*self.records.borrow())
            .map_err(|e| TesseraError::Serialization(e.to_string()))
    }

    /// Rebuild a log from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, TesseraError> {
        let records: Vec<Mutation> =
            serde_json::from_str(json).map_err(|e| TesseraError::Serialization(e.to_string()))?;
        Ok(Self {
            records: RefCell::new(records),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
