//! # tessera-core
//!
//! A normalized, in-memory entity store with deferred, replayable mutations.
//!
//! State is a tree of *branches*, one per model: an id-to-record map plus an
//! ordered id array. An [`EntityManager`] reads one branch and records writes
//! as [`Mutation`]s instead of applying them; a [`QuerySet`] is an immutable,
//! chainable view over a subsequence of the branch's ids. A reducer (the
//! reference one lives in [`reducer`]) later drains the log and produces the
//! next state tree.
//!
//! ## Architectural Constraints
//!
//! - Single-threaded and synchronous: `Rc`/`RefCell`, no locks, no async
//! - Reads never mutate the map or array they look at
//! - Writes are appended to the model's log, never applied eagerly
//! - Deterministic: `BTreeMap` only, integer values only
//!
//! ## Example
//!
//! ```
//! use tessera_core::{QueryCapable, Record, Schema, Table};
//!
//! let mut books: Table = Table::new(Schema::new("book"));
//! let manager = books.manager();
//! manager.create(Record::new().with("title", "Dune").with("year", 1965));
//! manager.create(Record::new().with("title", "Emma").with("year", 1815));
//! assert!(!manager.exists()); // nothing applied yet
//!
//! books.commit();
//! let oldest = books.manager().order_by("year").first().expect("non-empty");
//! assert_eq!(oldest.get("title").and_then(|v| v.as_str()), Some("Emma"));
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod manager;
pub mod matcher;
pub mod model;
pub mod mutation;
pub mod ordering;
pub mod primitives;
pub mod query;
pub mod reducer;
pub mod state;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{EntityId, Record, TesseraError, Value};

// =============================================================================
// RE-EXPORTS: Store
// =============================================================================

pub use config::{SchemaConfig, TesseraConfig, load_schemas, load_schemas_from_path};
pub use manager::EntityManager;
pub use matcher::matches;
pub use model::{Entity, Model, Schema, Table};
pub use mutation::{Mutation, MutationKind, MutationLog};
pub use ordering::{Comparator, OrderSpec};
pub use query::{Predicate, QueryCapable, QuerySet};
pub use reducer::apply;
pub use state::{BranchRef, EntityMap, IdArray, StateTree};
