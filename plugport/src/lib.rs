//! # PlugPort Core
//!
//! PlugPort is a MongoDB-compatible document database core layered over an
//! ordered key-value substrate. Clients use a document data model (JSON-like
//! records with an `_id`, filtered by query operators, maintained by
//! secondary indexes); this crate is the storage engine stack the front ends
//! call into.
//!
//! ## Components
//!
//! - [`index::encoding`] - sort-order-preserving serialization of values and
//!   composite keys; the bit-exact persisted state layout.
//! - [`index`] - secondary index lifecycle, maintenance under writes, and
//!   unique-constraint enforcement.
//! - [`query`] - filter analysis, plan selection (index scan vs. collection
//!   scan), and streaming execution with limit/skip/sort/projection.
//! - [`store`] - the document store coordinating CRUD: input validation, id
//!   allocation, atomic-in-intent document and index writes, per-collection
//!   serialization, and collection metadata.
//! - [`kv`] - the ordered KV substrate contract plus the in-memory backend.
//!
//! ## Quick Start
//!
//! ```rust
//! use plugport::store::DocumentStore;
//! use plugport::query::FindOptions;
//! use plugport::doc;
//!
//! # fn main() -> plugport::errors::PlugPortResult<()> {
//! let store = DocumentStore::in_memory();
//!
//! store.insert_one("users", doc! { "name": "Alice", "age": 30i64 }, None)?;
//! store.create_index("users", "age", false, None)?;
//!
//! let results = store.find(
//!     "users",
//!     &doc! { "age": { "$gte": 18i64 } },
//!     &FindOptions::new(),
//!     None,
//! )?;
//! assert_eq!(results.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Pattern
//!
//! Public handles (`DocumentStore`, `IndexManager`, `QueryExecutor`) follow
//! the PIMPL pattern: a cheap `Clone` wrapper over `Arc<Inner>`, so all
//! clones share state and the public interface stays stable while internals
//! evolve.

pub mod common;
pub mod errors;
pub mod index;
pub mod kv;
pub mod query;
pub mod store;

pub use common::{CancellationToken, Document, Value};
pub use errors::{ErrorKind, PlugPortError, PlugPortResult};
pub use store::DocumentStore;
