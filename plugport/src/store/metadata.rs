use crate::common::constants::INITIAL_SCHEMA_VERSION;
use crate::errors::PlugPortResult;
use crate::index::encoding::metadata_key;
use crate::index::IndexDescriptor;
use crate::kv::{KvStore, KvStoreRef};
use chrono::Utc;

/// Per-collection configuration row, stored under `meta:collection:<name>`.
///
/// The metadata row exists iff any document or index row for the collection
/// exists, with the exception of an explicitly created empty collection. It
/// is created on first insert (or explicit creation), mutated by index
/// lifecycle and CRUD operations, and destroyed by collection drop.
///
/// `document_count` is an eventually-accurate counter maintained by CRUD
/// deltas. It must never be trusted for filtered counts; those run a real
/// count operation.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CollectionMetadata {
    pub name: String,
    pub indexes: Vec<IndexDescriptor>,
    pub created_at: i64,
    pub schema_version: u32,
    pub document_count: u64,
}

impl CollectionMetadata {
    /// Creates fresh metadata with the implicit `_id_` index.
    pub fn new(name: &str) -> Self {
        CollectionMetadata {
            name: name.to_string(),
            indexes: vec![IndexDescriptor::id_index()],
            created_at: Utc::now().timestamp_millis(),
            schema_version: INITIAL_SCHEMA_VERSION,
            document_count: 0,
        }
    }

    /// Finds an index by the field it covers.
    pub fn index_on_field(&self, field: &str) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|d| d.field == field)
    }

    /// Finds an index by name.
    pub fn index_by_name(&self, name: &str) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|d| d.name == name)
    }

    /// Removes an index by name, returning the removed descriptor.
    pub fn remove_index(&mut self, name: &str) -> Option<IndexDescriptor> {
        let position = self.indexes.iter().position(|d| d.name == name)?;
        Some(self.indexes.remove(position))
    }

    /// Loads metadata from the substrate, or `None` when the collection is
    /// absent.
    pub fn load(kv: &KvStoreRef, name: &str) -> PlugPortResult<Option<CollectionMetadata>> {
        match kv.get(&metadata_key(name))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persists the metadata row.
    pub fn save(&self, kv: &KvStoreRef) -> PlugPortResult<()> {
        kv.put(metadata_key(&self.name), serde_json::to_vec(self)?)
    }

    /// Deletes the metadata row, returning whether it existed.
    pub fn delete(kv: &KvStoreRef, name: &str) -> PlugPortResult<bool> {
        kv.delete(&metadata_key(name))
    }
}
