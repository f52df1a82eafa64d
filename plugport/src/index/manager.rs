use crate::common::cancel::{check_cancelled, CancellationToken};
use crate::common::constants::{INDEX_ROW_SENTINEL, KEY_LOWER_SUCCESSOR, SCAN_CHUNK_SIZE, UNIT_SEPARATOR};
use crate::common::document::Document;
use crate::common::value::Value;
use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};
use crate::index::encoding::{
    collection_index_prefix, decode_index_key, document_prefix, encode_value, index_prefix,
    index_row_key,
};
use crate::index::IndexDescriptor;
use crate::kv::{KvStore, KvStoreRef, ScanOptions};
use std::collections::HashSet;
use std::sync::Arc;

/// Planned index mutations for one document operation.
///
/// The manager computes mutations in a first phase without touching the
/// substrate (apart from uniqueness probes); the store applies them in a
/// second phase, ordering the document write after the index writes or
/// routing everything through one batch when the backend supports it.
#[derive(Debug, Default)]
pub struct IndexWriteBatch {
    pub puts: Vec<(Vec<u8>, Vec<u8>)>,
    pub deletes: Vec<Vec<u8>>,
}

impl IndexWriteBatch {
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }
}

/// Maintains secondary index rows under document mutations.
///
/// The manager owns no state of its own; all state lives in the KV substrate.
/// It exposes index lifecycle operations (create with retroactive build,
/// drop, drop-all) and the write hooks the document store drives on insert,
/// update, and delete.
#[derive(Clone)]
pub struct IndexManager {
    inner: Arc<IndexManagerInner>,
}

impl IndexManager {
    pub fn new(kv: KvStoreRef) -> Self {
        IndexManager {
            inner: Arc::new(IndexManagerInner { kv }),
        }
    }

    /// Creates an index on `field`, building entries for every existing
    /// document.
    ///
    /// If an index on the field already exists in `existing` it is returned
    /// unchanged. Metadata is not mutated here; the document store appends
    /// the returned descriptor itself.
    ///
    /// # Errors
    /// [`ErrorKind::DuplicateKey`] when `unique` is set and two documents
    /// share an indexed value; rows written before the failure are removed.
    pub fn create_index(
        &self,
        collection: &str,
        existing: &[IndexDescriptor],
        field: &str,
        unique: bool,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<IndexDescriptor> {
        self.inner
            .create_index(collection, existing, field, unique, cancel)
    }

    /// Removes every row of one index.
    pub fn drop_index(
        &self,
        collection: &str,
        field: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<()> {
        self.inner
            .remove_rows_under(&index_prefix(collection, field), cancel)
    }

    /// Removes every index row of a collection, across all indexes.
    pub fn drop_all_indexes(
        &self,
        collection: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<()> {
        self.inner
            .remove_rows_under(&collection_index_prefix(collection), cancel)
    }

    /// Plans the index puts for a new document, running uniqueness checks.
    pub fn on_insert(
        &self,
        collection: &str,
        indexes: &[IndexDescriptor],
        document: &Document,
        id: &str,
    ) -> PlugPortResult<IndexWriteBatch> {
        self.inner.on_insert(collection, indexes, document, id)
    }

    /// Plans the index deletes and puts for an updated document.
    ///
    /// Indexes whose value is structurally unchanged are skipped; uniqueness
    /// checks on new values exclude the document's own id.
    pub fn on_update(
        &self,
        collection: &str,
        indexes: &[IndexDescriptor],
        old_document: &Document,
        new_document: &Document,
        id: &str,
    ) -> PlugPortResult<IndexWriteBatch> {
        self.inner
            .on_update(collection, indexes, old_document, new_document, id)
    }

    /// Plans the index deletes for a removed document.
    pub fn on_delete(
        &self,
        collection: &str,
        indexes: &[IndexDescriptor],
        document: &Document,
        id: &str,
    ) -> PlugPortResult<IndexWriteBatch> {
        self.inner.on_delete(collection, indexes, document, id)
    }
}

struct IndexManagerInner {
    kv: KvStoreRef,
}

impl IndexManagerInner {
    fn create_index(
        &self,
        collection: &str,
        existing: &[IndexDescriptor],
        field: &str,
        unique: bool,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<IndexDescriptor> {
        if let Some(descriptor) = existing.iter().find(|d| d.field == field) {
            return Ok(descriptor.clone());
        }

        let descriptor = IndexDescriptor::new(field, unique);
        log::debug!(
            "Building index {} on {}.{} (unique: {})",
            descriptor.name,
            collection,
            field,
            unique
        );

        // Bounded by the number of distinct indexed values in the collection.
        let mut seen: HashSet<String> = HashSet::new();
        let prefix = document_prefix(collection);
        let mut start = prefix.clone();
        let mut built = 0u64;

        loop {
            if let Err(err) = check_cancelled(cancel) {
                self.rollback_build(collection, field);
                return Err(err);
            }

            let entries = self.kv.scan(
                ScanOptions {
                    prefix: Some(prefix.clone()),
                    start_key: Some(start.clone()),
                    ..Default::default()
                }
                .limit(SCAN_CHUNK_SIZE),
            )?;

            for entry in &entries {
                let document = Document::from_bytes(&entry.value)?;
                let value = match index_value(&document, field) {
                    Some(value) => value,
                    None => continue,
                };
                let encoded = match encode_value(value) {
                    Ok(encoded) => encoded,
                    Err(err) => {
                        self.rollback_build(collection, field);
                        return Err(err);
                    }
                };
                if unique && !seen.insert(encoded.clone()) {
                    self.rollback_build(collection, field);
                    log::error!(
                        "Duplicate value while building unique index {} on {}",
                        descriptor.name,
                        collection
                    );
                    return Err(duplicate_key_error(
                        collection,
                        &descriptor.name,
                        field,
                        value,
                    ));
                }
                let id = match document.id() {
                    Some(id) => id.to_string(),
                    None => continue,
                };
                self.kv.put(
                    index_row_key(collection, field, &encoded, &id),
                    INDEX_ROW_SENTINEL.to_vec(),
                )?;
                built += 1;
            }

            if entries.len() < SCAN_CHUNK_SIZE {
                break;
            }
            // strictly-after semantics on an inclusive-start scan
            start = entries.last().map(|e| e.key.clone()).unwrap_or_default();
            start.push(KEY_LOWER_SUCCESSOR);
        }

        log::debug!(
            "Index {} on {} built with {} entries",
            descriptor.name,
            collection,
            built
        );
        Ok(descriptor)
    }

    /// Removes rows written by a failed build. Errors are logged and
    /// swallowed: the build failure is the error the caller must see.
    fn rollback_build(&self, collection: &str, field: &str) {
        if let Err(err) = self.remove_rows_under(&index_prefix(collection, field), None) {
            log::warn!(
                "Failed to roll back partial index build on {}.{}: {}",
                collection,
                field,
                err
            );
        }
    }

    fn remove_rows_under(
        &self,
        prefix: &[u8],
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<()> {
        loop {
            check_cancelled(cancel)?;
            let entries = self
                .kv
                .scan(ScanOptions::with_prefix(prefix.to_vec()).limit(SCAN_CHUNK_SIZE))?;
            if entries.is_empty() {
                return Ok(());
            }
            for entry in &entries {
                self.kv.delete(&entry.key)?;
            }
            if entries.len() < SCAN_CHUNK_SIZE {
                return Ok(());
            }
        }
    }

    fn on_insert(
        &self,
        collection: &str,
        indexes: &[IndexDescriptor],
        document: &Document,
        id: &str,
    ) -> PlugPortResult<IndexWriteBatch> {
        let mut batch = IndexWriteBatch::default();
        for descriptor in indexes {
            let value = match index_value(document, &descriptor.field) {
                Some(value) => value,
                None => continue,
            };
            let encoded = encode_value(value)?;
            if descriptor.unique {
                self.ensure_unique(collection, descriptor, &encoded, value, None)?;
            }
            batch.puts.push((
                index_row_key(collection, &descriptor.field, &encoded, id),
                INDEX_ROW_SENTINEL.to_vec(),
            ));
        }
        Ok(batch)
    }

    fn on_update(
        &self,
        collection: &str,
        indexes: &[IndexDescriptor],
        old_document: &Document,
        new_document: &Document,
        id: &str,
    ) -> PlugPortResult<IndexWriteBatch> {
        let mut batch = IndexWriteBatch::default();
        for descriptor in indexes {
            let old_value = index_value(old_document, &descriptor.field);
            let new_value = index_value(new_document, &descriptor.field);
            if old_value == new_value {
                continue;
            }

            if let Some(old_value) = old_value {
                let encoded = encode_value(old_value)?;
                batch
                    .deletes
                    .push(index_row_key(collection, &descriptor.field, &encoded, id));
            }
            if let Some(new_value) = new_value {
                let encoded = encode_value(new_value)?;
                if descriptor.unique {
                    self.ensure_unique(collection, descriptor, &encoded, new_value, Some(id))?;
                }
                batch.puts.push((
                    index_row_key(collection, &descriptor.field, &encoded, id),
                    INDEX_ROW_SENTINEL.to_vec(),
                ));
            }
        }
        Ok(batch)
    }

    fn on_delete(
        &self,
        collection: &str,
        indexes: &[IndexDescriptor],
        document: &Document,
        id: &str,
    ) -> PlugPortResult<IndexWriteBatch> {
        let mut batch = IndexWriteBatch::default();
        for descriptor in indexes {
            if let Some(value) = index_value(document, &descriptor.field) {
                let encoded = encode_value(value)?;
                batch
                    .deletes
                    .push(index_row_key(collection, &descriptor.field, &encoded, id));
            }
        }
        Ok(batch)
    }

    /// Probes the index for another document holding the encoded value.
    ///
    /// A limit-2 scan suffices: a correctly maintained unique index has at
    /// most one row per value, so seeing a second proves the violation
    /// without full enumeration.
    fn ensure_unique(
        &self,
        collection: &str,
        descriptor: &IndexDescriptor,
        encoded: &str,
        value: &Value,
        exclude_id: Option<&str>,
    ) -> PlugPortResult<()> {
        let mut prefix = index_prefix(collection, &descriptor.field);
        prefix.extend_from_slice(encoded.as_bytes());
        prefix.push(UNIT_SEPARATOR);

        let entries = self.kv.scan(ScanOptions::with_prefix(prefix).limit(2))?;
        for entry in entries {
            let Some((_, id)) = decode_index_key(&entry.key) else {
                continue;
            };
            if exclude_id == Some(id.as_str()) {
                continue;
            }
            log::error!(
                "Duplicate key in unique index {} on {}.{}",
                descriptor.name,
                collection,
                descriptor.field
            );
            return Err(duplicate_key_error(
                collection,
                &descriptor.name,
                &descriptor.field,
                value,
            ));
        }
        Ok(())
    }
}

/// Returns the indexable value of a field: `None` when the field is absent or
/// null, since such documents produce no index row.
fn index_value<'a>(document: &'a Document, field: &str) -> Option<&'a Value> {
    match document.get(field) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

fn duplicate_key_error(
    collection: &str,
    index_name: &str,
    field: &str,
    value: &Value,
) -> PlugPortError {
    PlugPortError::new(
        &format!(
            "Duplicate key error collection: {} index: {} field: {} value: {}",
            collection, index_name, field, value
        ),
        ErrorKind::DuplicateKey,
    )
}
