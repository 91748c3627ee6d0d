//! Thingraph – typed entities over subject–predicate–object triples, edited
//! through invertible, transactional change batches.
//!
//! The crate is built from a handful of small pieces:
//! * A [`construct::Triple`] is a fact `(subject, predicate, object)` where
//!   the subject and predicate are [`construct::Identifier`]s and the object is
//!   a [`construct::Value`], either a reference to another entity or a literal.
//! * A [`construct::Thing`] gathers every fact sharing one subject, shaped by a
//!   [`construct::Kind`] chosen from the subject's `rdf:type` assertions.
//! * An [`operation::Operation`] creates or deletes exactly one fact and is
//!   trivially invertible.
//! * A [`changeset::ChangeSet`] applies its deletes and then its creates as a
//!   single unit; a [`transformation::Transformation`] applies an ordered list
//!   of change sets, and inverts by reversing that list.
//!
//! ## Type resolution
//! The [`registry::TypeRegistry`] is a data-driven table from ontology type
//! identifiers to constructors. The [`mapper::EntityMapper`] groups triples by
//! subject and asks the registry for the kind of each group. Subjects without
//! any type assertion are rejected on read; unknown or foreign types degrade
//! to the generic kind.
//!
//! ## Storage
//! Operations are written against the [`store::Store`] contract. Two adapters
//! ship with the crate: [`memory::MemoryStore`] and the SQLite backed
//! [`persist::SqliteStore`]. Both support graph-pattern construct queries
//! from the [`query`] module.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use thingraph::changeset::ChangeSet;
//! use thingraph::construct::{rdf_type, Identifier};
//! use thingraph::mapper::EntityMapper;
//! use thingraph::memory::MemoryStore;
//! use thingraph::registry::{Constructor, TypeRegistry};
//! use thingraph::store::Store;
//!
//! const ONT: &str = "http://example.org/ontology#";
//! let registry = TypeRegistry::builder()
//!     .ontology_namespace(ONT)
//!     .register(Identifier::new(ONT, "Person")?, Constructor::new("Person"))
//!     .build();
//! let mut store = MemoryStore::new(Arc::new(EntityMapper::new(Arc::new(registry))));
//!
//! let p = Identifier::new("http://example.org/data#", "P")?;
//! let name = Identifier::new(ONT, "name")?;
//! let changes = ChangeSet::new()
//!     .create(p.clone(), rdf_type(), Identifier::new(ONT, "Person")?)
//!     .create(p.clone(), name, "Trillian");
//! changes.apply(&mut store)?;
//!
//! let thing = store.get(&p)?.expect("P was created");
//! assert!(thing.is_a("Person"));
//!
//! changes.invert().apply(&mut store)?;
//! assert!(store.get(&p)?.is_none());
//! # Ok::<(), thingraph::ThingraphError>(())
//! ```

pub mod changeset;
pub mod construct;
pub mod error;
pub mod mapper;
pub mod memory;
pub mod operation;
pub mod persist;
pub mod query;
pub mod registry;
pub mod settings;
pub mod store;
pub mod transformation;

pub use error::{ErrorKind, Result, ThingraphError};
