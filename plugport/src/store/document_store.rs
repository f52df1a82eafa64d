use crate::common::cancel::{check_cancelled, CancellationToken};
use crate::common::constants::{
    BULK_UPDATE_CAP, DEFAULT_FIND_LIMIT, DOC_ID, FILTERED_COUNT_CAP, ID_INDEX_NAME,
    KEY_LOWER_SUCCESSOR, MAX_DOCUMENT_SIZE, MAX_FIND_LIMIT, META_COLLECTION_PREFIX,
    SCAN_CHUNK_SIZE,
};
use crate::common::document::Document;
use crate::common::lock::LockRegistry;
use crate::common::value::Value;
use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};
use crate::index::encoding::{document_key, document_prefix};
use crate::index::manager::{IndexManager, IndexWriteBatch};
use crate::kv::{InMemoryKv, KvStore, KvStoreRef, ScanOptions};
use crate::query::executor::QueryExecutor;
use crate::query::planner::create_find_plan;
use crate::query::FindOptions;
use crate::store::id_generator::generate_document_id;
use crate::store::metadata::CollectionMetadata;
use crate::store::validation::{
    sanitize_document, validate_collection_name, validate_document_id, validate_index_field,
};
use crate::store::{
    CollectionInfo, CollectionStats, DeleteResult, InsertResult, UpdateOptions, UpdateResult,
};
use std::sync::Arc;

/// Store-level configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum serialized document size in bytes.
    pub max_document_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            max_document_size: MAX_DOCUMENT_SIZE,
        }
    }
}

/// The document store: orchestrates CRUD, validates every external input,
/// serializes per-collection mutations, maintains collection metadata, and
/// delegates to the index manager and query executor.
///
/// Front ends call these operations; everything below them is keyspace
/// plumbing over the KV substrate. Clones share state; the store is safe to
/// use from many threads, with requests on different collections proceeding
/// in parallel and mutations on one collection serialized through its lock.
///
/// Every operation accepts an optional [`CancellationToken`] observed at
/// chunk boundaries.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<DocumentStoreInner>,
}

impl DocumentStore {
    /// Creates a store over the given substrate with default configuration.
    pub fn new(kv: KvStoreRef) -> Self {
        DocumentStore::with_config(kv, StoreConfig::default())
    }

    /// Creates a store with explicit configuration.
    pub fn with_config(kv: KvStoreRef, config: StoreConfig) -> Self {
        DocumentStore {
            inner: Arc::new(DocumentStoreInner {
                index_manager: IndexManager::new(kv.clone()),
                executor: QueryExecutor::new(kv.clone()),
                locks: LockRegistry::new(),
                kv,
                config,
            }),
        }
    }

    /// Creates a store backed by the in-memory substrate.
    pub fn in_memory() -> Self {
        DocumentStore::new(Arc::new(InMemoryKv::new()))
    }

    /// Inserts a single document, allocating an `_id` if absent.
    pub fn insert_one(
        &self,
        collection: &str,
        document: Document,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<InsertResult> {
        self.inner.insert_many(collection, vec![document], cancel)
    }

    /// Inserts a batch of documents.
    ///
    /// The first failure terminates the batch; the metadata document count
    /// reflects what was committed before it.
    pub fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<InsertResult> {
        self.inner.insert_many(collection, documents, cancel)
    }

    /// Finds documents matching a filter, in plan order (or sort order when
    /// requested).
    pub fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Vec<Document>> {
        self.inner.find(collection, filter, options, cancel)
    }

    /// Finds the first document matching a filter.
    pub fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        projection: Option<Document>,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Option<Document>> {
        let mut options = FindOptions::new().with_limit(1);
        options.projection = projection;
        let mut documents = self.inner.find(collection, filter, &options, cancel)?;
        Ok(if documents.is_empty() {
            None
        } else {
            Some(documents.swap_remove(0))
        })
    }

    /// Updates the first document matching the filter.
    pub fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<UpdateResult> {
        self.inner
            .update(collection, filter, update, options, true, cancel)
    }

    /// Updates every document matching the filter, up to the bulk cap.
    pub fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<UpdateResult> {
        self.inner
            .update(collection, filter, update, options, false, cancel)
    }

    /// Deletes the first document matching the filter.
    pub fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<DeleteResult> {
        self.inner.delete(collection, filter, true, cancel)
    }

    /// Deletes every document matching the filter.
    pub fn delete_many(
        &self,
        collection: &str,
        filter: &Document,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<DeleteResult> {
        self.inner.delete(collection, filter, false, cancel)
    }

    /// Counts documents matching a filter.
    ///
    /// An empty filter returns the eventually-accurate metadata counter;
    /// anything else runs a real scan capped at the count ceiling.
    pub fn count_documents(
        &self,
        collection: &str,
        filter: &Document,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<u64> {
        self.inner.count_documents(collection, filter, cancel)
    }

    /// Creates an index on a field, building entries for existing documents.
    /// Returns the index name.
    pub fn create_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<String> {
        self.inner.create_index(collection, field, unique, cancel)
    }

    /// Drops an index by name. The `_id_` index cannot be dropped.
    pub fn drop_index(
        &self,
        collection: &str,
        name: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<bool> {
        self.inner.drop_index(collection, name, cancel)
    }

    /// Lists the indexes of a collection; empty when the collection is
    /// absent.
    pub fn list_indexes(
        &self,
        collection: &str,
    ) -> PlugPortResult<Vec<crate::index::IndexDescriptor>> {
        self.inner.list_indexes(collection)
    }

    /// Lists all collections with summary information.
    pub fn list_collections(&self) -> PlugPortResult<Vec<CollectionInfo>> {
        self.inner.list_collections()
    }

    /// Explicitly creates an empty collection. Returns false when it already
    /// exists.
    pub fn create_collection(&self, collection: &str) -> PlugPortResult<bool> {
        self.inner.create_collection(collection)
    }

    /// Drops a collection: every document row, every index row, and the
    /// metadata row. Returns false when the collection is absent.
    pub fn drop_collection(
        &self,
        collection: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<bool> {
        self.inner.drop_collection(collection, cancel)
    }

    /// Returns storage statistics for a collection.
    pub fn stats(
        &self,
        collection: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<CollectionStats> {
        self.inner.stats(collection, cancel)
    }
}

struct DocumentStoreInner {
    kv: KvStoreRef,
    index_manager: IndexManager,
    executor: QueryExecutor,
    locks: LockRegistry,
    config: StoreConfig,
}

impl DocumentStoreInner {
    fn get_or_create_metadata(&self, collection: &str) -> PlugPortResult<CollectionMetadata> {
        if let Some(metadata) = CollectionMetadata::load(&self.kv, collection)? {
            return Ok(metadata);
        }
        let metadata = CollectionMetadata::new(collection);
        metadata.save(&self.kv)?;
        log::debug!("Created collection {}", collection);
        Ok(metadata)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<InsertResult> {
        validate_collection_name(collection)?;
        if documents.is_empty() {
            return Ok(InsertResult::default());
        }
        for document in &documents {
            sanitize_document(document)?;
            if let Some(value) = document.get(DOC_ID) {
                validate_document_id(value)?;
            }
        }

        let handle = self.locks.get_lock(collection);
        let _guard = handle.lock();
        let mut metadata = self.get_or_create_metadata(collection)?;

        let inserted = self.insert_locked(&mut metadata, documents, cancel);
        match inserted {
            Ok(inserted_ids) => {
                log::debug!(
                    "Inserted {} documents into {}",
                    inserted_ids.len(),
                    collection
                );
                Ok(InsertResult {
                    inserted_count: inserted_ids.len() as u64,
                    inserted_ids,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Inserts documents under an already-held collection lock, committing
    /// the document-count delta for whatever succeeded even when a later
    /// document fails.
    fn insert_locked(
        &self,
        metadata: &mut CollectionMetadata,
        documents: Vec<Document>,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Vec<String>> {
        let collection = metadata.name.clone();
        let mut inserted_ids: Vec<String> = Vec::with_capacity(documents.len());

        let outcome = (|| -> PlugPortResult<()> {
            for (position, document) in documents.into_iter().enumerate() {
                if position % SCAN_CHUNK_SIZE == 0 {
                    check_cancelled(cancel)?;
                }
                let mut document = document;
                let id = match document.id().map(str::to_string) {
                    Some(id) => id,
                    None => {
                        let id = generate_document_id();
                        document.set_id(&id);
                        id
                    }
                };

                let bytes = document.to_bytes()?;
                if bytes.len() > self.config.max_document_size {
                    return Err(PlugPortError::new(
                        &format!(
                            "Document of {} bytes exceeds the {} byte limit",
                            bytes.len(),
                            self.config.max_document_size
                        ),
                        ErrorKind::DocumentTooLarge,
                    ));
                }

                let batch =
                    self.index_manager
                        .on_insert(&collection, &metadata.indexes, &document, &id)?;
                self.apply_insert(&collection, &id, bytes, batch)?;
                inserted_ids.push(id);
            }
            Ok(())
        })();

        metadata.document_count += inserted_ids.len() as u64;
        if let Err(save_err) = metadata.save(&self.kv) {
            log::warn!(
                "Failed to commit document count for {}: {}",
                collection,
                save_err
            );
        }

        outcome.map(|_| inserted_ids)
    }

    /// Applies the planned index puts and the document row. The document is
    /// stored last so a partial failure leaves orphan index rows, which the
    /// scan path tolerates, never an orphan document.
    fn apply_insert(
        &self,
        collection: &str,
        id: &str,
        document_bytes: Vec<u8>,
        batch: IndexWriteBatch,
    ) -> PlugPortResult<()> {
        let doc_key = document_key(collection, id);

        if self.kv.supports_batch() {
            let mut puts = batch.puts;
            puts.push((doc_key, document_bytes));
            return self.kv.batch_write(puts, batch.deletes);
        }

        let mut applied: Vec<Vec<u8>> = Vec::with_capacity(batch.puts.len());
        for (key, value) in batch.puts {
            if let Err(err) = self.kv.put(key.clone(), value) {
                for written in &applied {
                    if let Err(rollback_err) = self.kv.delete(written) {
                        log::warn!("Failed to roll back index row: {}", rollback_err);
                    }
                }
                return Err(PlugPortError::with_cause(
                    "Failed to write index entry during insert",
                    ErrorKind::InternalError,
                    err,
                ));
            }
            applied.push(key);
        }
        self.kv.put(doc_key, document_bytes)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Vec<Document>> {
        validate_collection_name(collection)?;
        sanitize_document(filter)?;
        if let Some(projection) = &options.projection {
            sanitize_document(projection)?;
        }

        let Some(metadata) = CollectionMetadata::load(&self.kv, collection)? else {
            return Ok(Vec::new());
        };

        let mut effective = options.clone();
        effective.limit = Some(effective_find_limit(options.limit));

        let plan = create_find_plan(collection, filter, &metadata.indexes, metadata.document_count)?;
        log::debug!(
            "find on {}: index_scan={} post_filter={} cost={}",
            collection,
            plan.is_index_scan(),
            plan.needs_post_filter,
            plan.cost_estimate
        );
        self.executor
            .execute(collection, &plan, filter, &effective, cancel)
    }

    fn count_documents(
        &self,
        collection: &str,
        filter: &Document,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<u64> {
        validate_collection_name(collection)?;
        sanitize_document(filter)?;

        let Some(metadata) = CollectionMetadata::load(&self.kv, collection)? else {
            return Ok(0);
        };
        if filter.is_empty() {
            return Ok(metadata.document_count);
        }

        let plan = create_find_plan(collection, filter, &metadata.indexes, metadata.document_count)?;
        let options = FindOptions::new().with_limit(FILTERED_COUNT_CAP);
        let documents = self
            .executor
            .execute(collection, &plan, filter, &options, cancel)?;
        Ok(documents.len() as u64)
    }

    fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: &UpdateOptions,
        just_one: bool,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<UpdateResult> {
        validate_collection_name(collection)?;
        sanitize_document(filter)?;
        sanitize_document(update)?;
        validate_update_spec(update)?;

        let handle = self.locks.get_lock(collection);
        let _guard = handle.lock();

        let mut metadata = match CollectionMetadata::load(&self.kv, collection)? {
            Some(metadata) => metadata,
            None => {
                if !options.upsert {
                    return Ok(UpdateResult::default());
                }
                self.get_or_create_metadata(collection)?
            }
        };

        let plan = create_find_plan(collection, filter, &metadata.indexes, metadata.document_count)?;
        let exec_options =
            FindOptions::new().with_limit(if just_one { 1 } else { BULK_UPDATE_CAP });
        let matched_docs = self
            .executor
            .execute(collection, &plan, filter, &exec_options, cancel)?;

        if matched_docs.is_empty() {
            if !options.upsert {
                return Ok(UpdateResult::default());
            }
            let base = build_upsert_document(filter, update)?;
            if let Some(value) = base.get(DOC_ID) {
                validate_document_id(value)?;
            }
            let inserted = self.insert_locked(&mut metadata, vec![base], cancel)?;
            return Ok(UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: inserted.into_iter().next(),
            });
        }

        let mut matched_count = 0u64;
        let mut modified_count = 0u64;
        for (position, old_document) in matched_docs.into_iter().enumerate() {
            if position % SCAN_CHUNK_SIZE == 0 {
                check_cancelled(cancel)?;
            }
            matched_count += 1;

            let mut new_document = old_document.clone();
            if !apply_update_operators(&mut new_document, update)? {
                continue;
            }

            let id = old_document
                .id()
                .ok_or_else(|| {
                    PlugPortError::new("Stored document has no _id", ErrorKind::InternalError)
                })?
                .to_string();

            let bytes = new_document.to_bytes()?;
            if bytes.len() > self.config.max_document_size {
                return Err(PlugPortError::new(
                    &format!(
                        "Document of {} bytes exceeds the {} byte limit",
                        bytes.len(),
                        self.config.max_document_size
                    ),
                    ErrorKind::DocumentTooLarge,
                ));
            }

            let batch = self.index_manager.on_update(
                collection,
                &metadata.indexes,
                &old_document,
                &new_document,
                &id,
            )?;
            self.apply_update(collection, &id, bytes, batch)?;
            modified_count += 1;
        }

        log::debug!(
            "update on {}: matched={} modified={}",
            collection,
            matched_count,
            modified_count
        );
        Ok(UpdateResult {
            matched_count,
            modified_count,
            upserted_id: None,
        })
    }

    /// Applies index deletes, then index puts, then the document row at the
    /// same key.
    fn apply_update(
        &self,
        collection: &str,
        id: &str,
        document_bytes: Vec<u8>,
        batch: IndexWriteBatch,
    ) -> PlugPortResult<()> {
        let doc_key = document_key(collection, id);

        if self.kv.supports_batch() {
            let mut puts = batch.puts;
            puts.push((doc_key, document_bytes));
            return self.kv.batch_write(puts, batch.deletes);
        }

        for key in batch.deletes {
            self.kv.delete(&key)?;
        }
        for (key, value) in batch.puts {
            self.kv.put(key, value)?;
        }
        self.kv.put(doc_key, document_bytes)
    }

    fn delete(
        &self,
        collection: &str,
        filter: &Document,
        just_one: bool,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<DeleteResult> {
        validate_collection_name(collection)?;
        sanitize_document(filter)?;

        let handle = self.locks.get_lock(collection);
        let _guard = handle.lock();

        let Some(mut metadata) = CollectionMetadata::load(&self.kv, collection)? else {
            return Ok(DeleteResult::default());
        };

        let plan = create_find_plan(collection, filter, &metadata.indexes, metadata.document_count)?;
        let mut deleted_count = 0u64;

        loop {
            check_cancelled(cancel)?;
            let exec_options =
                FindOptions::new().with_limit(if just_one { 1 } else { SCAN_CHUNK_SIZE });
            let documents = self
                .executor
                .execute(collection, &plan, filter, &exec_options, cancel)?;
            let chunk_len = documents.len();

            for document in documents {
                let Some(id) = document.id().map(str::to_string) else {
                    continue;
                };
                let batch =
                    self.index_manager
                        .on_delete(collection, &metadata.indexes, &document, &id)?;
                self.apply_delete(collection, &id, batch)?;
                deleted_count += 1;
            }

            if just_one || chunk_len < SCAN_CHUNK_SIZE {
                break;
            }
        }

        metadata.document_count = metadata.document_count.saturating_sub(deleted_count);
        metadata.save(&self.kv)?;
        log::debug!("delete on {}: deleted={}", collection, deleted_count);
        Ok(DeleteResult { deleted_count })
    }

    /// Deletes the document row first, then its index rows, so a partial
    /// failure leaves orphan index rows, which the scan path tolerates.
    fn apply_delete(
        &self,
        collection: &str,
        id: &str,
        batch: IndexWriteBatch,
    ) -> PlugPortResult<()> {
        let doc_key = document_key(collection, id);

        if self.kv.supports_batch() {
            let mut deletes = vec![doc_key];
            deletes.extend(batch.deletes);
            return self.kv.batch_write(Vec::new(), deletes);
        }

        self.kv.delete(&doc_key)?;
        for key in batch.deletes {
            self.kv.delete(&key)?;
        }
        Ok(())
    }

    fn create_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<String> {
        validate_collection_name(collection)?;
        validate_index_field(field)?;

        let handle = self.locks.get_lock(collection);
        let _guard = handle.lock();
        let mut metadata = self.get_or_create_metadata(collection)?;

        if let Some(descriptor) = metadata.index_on_field(field) {
            return Ok(descriptor.name.clone());
        }

        let descriptor =
            self.index_manager
                .create_index(collection, &metadata.indexes, field, unique, cancel)?;
        let name = descriptor.name.clone();
        metadata.indexes.push(descriptor);
        metadata.save(&self.kv)?;
        log::debug!("Created index {} on {}", name, collection);
        Ok(name)
    }

    fn drop_index(
        &self,
        collection: &str,
        name: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<bool> {
        validate_collection_name(collection)?;
        if name == ID_INDEX_NAME {
            return Err(PlugPortError::new(
                "Cannot drop the mandatory _id_ index",
                ErrorKind::InvalidLength,
            ));
        }

        let handle = self.locks.get_lock(collection);
        let _guard = handle.lock();

        let Some(mut metadata) = CollectionMetadata::load(&self.kv, collection)? else {
            return Ok(false);
        };
        let Some(descriptor) = metadata.index_by_name(name).cloned() else {
            return Err(PlugPortError::new(
                &format!("Index {} not found on {}", name, collection),
                ErrorKind::IndexNotFound,
            ));
        };

        self.index_manager
            .drop_index(collection, &descriptor.field, cancel)?;
        metadata.remove_index(name);
        metadata.save(&self.kv)?;
        log::debug!("Dropped index {} on {}", name, collection);
        Ok(true)
    }

    fn list_indexes(&self, collection: &str) -> PlugPortResult<Vec<crate::index::IndexDescriptor>> {
        validate_collection_name(collection)?;
        Ok(CollectionMetadata::load(&self.kv, collection)?
            .map(|metadata| metadata.indexes)
            .unwrap_or_default())
    }

    fn list_collections(&self) -> PlugPortResult<Vec<CollectionInfo>> {
        let entries = self
            .kv
            .scan(ScanOptions::with_prefix(META_COLLECTION_PREFIX.as_bytes().to_vec()))?;
        let mut collections = Vec::with_capacity(entries.len());
        for entry in entries {
            let metadata: CollectionMetadata = serde_json::from_slice(&entry.value)?;
            collections.push(CollectionInfo {
                name: metadata.name,
                document_count: metadata.document_count,
                index_count: metadata.indexes.len(),
                created_at: metadata.created_at,
            });
        }
        Ok(collections)
    }

    fn create_collection(&self, collection: &str) -> PlugPortResult<bool> {
        validate_collection_name(collection)?;
        let handle = self.locks.get_lock(collection);
        let _guard = handle.lock();

        if CollectionMetadata::load(&self.kv, collection)?.is_some() {
            return Ok(false);
        }
        CollectionMetadata::new(collection).save(&self.kv)?;
        log::debug!("Explicitly created collection {}", collection);
        Ok(true)
    }

    fn drop_collection(
        &self,
        collection: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<bool> {
        validate_collection_name(collection)?;
        let handle = self.locks.get_lock(collection);
        let _guard = handle.lock();

        if CollectionMetadata::load(&self.kv, collection)?.is_none() {
            return Ok(false);
        }

        let prefix = document_prefix(collection);
        loop {
            check_cancelled(cancel)?;
            let entries = self
                .kv
                .scan(ScanOptions::with_prefix(prefix.clone()).limit(SCAN_CHUNK_SIZE))?;
            if entries.is_empty() {
                break;
            }
            for entry in &entries {
                self.kv.delete(&entry.key)?;
            }
            if entries.len() < SCAN_CHUNK_SIZE {
                break;
            }
        }

        self.index_manager.drop_all_indexes(collection, cancel)?;
        CollectionMetadata::delete(&self.kv, collection)?;
        log::debug!("Dropped collection {}", collection);
        Ok(true)
    }

    fn stats(
        &self,
        collection: &str,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<CollectionStats> {
        validate_collection_name(collection)?;
        let Some(metadata) = CollectionMetadata::load(&self.kv, collection)? else {
            return Err(PlugPortError::new(
                &format!("Collection {:?} not found", collection),
                ErrorKind::NamespaceNotFound,
            ));
        };

        let prefix = document_prefix(collection);
        let mut storage_size_bytes = 0u64;
        let mut start = prefix.clone();
        loop {
            check_cancelled(cancel)?;
            let entries = self.kv.scan(
                ScanOptions {
                    prefix: Some(prefix.clone()),
                    start_key: Some(start.clone()),
                    ..Default::default()
                }
                .limit(SCAN_CHUNK_SIZE),
            )?;
            for entry in &entries {
                storage_size_bytes += entry.value.len() as u64;
            }
            if entries.len() < SCAN_CHUNK_SIZE {
                break;
            }
            start = entries.last().map(|e| e.key.clone()).unwrap_or_default();
            start.push(KEY_LOWER_SUCCESSOR);
        }

        Ok(CollectionStats {
            document_count: metadata.document_count,
            index_count: metadata.indexes.len(),
            storage_size_bytes,
        })
    }
}

/// Clamps a requested find limit: unset or zero falls back to the default
/// soft cap, and everything is bounded by the hard ceiling.
fn effective_find_limit(requested: Option<usize>) -> usize {
    match requested {
        Some(limit) if limit > 0 => limit.min(MAX_FIND_LIMIT),
        _ => DEFAULT_FIND_LIMIT,
    }
}

/// Rejects update documents whose top-level keys are not the supported
/// operators, or whose payloads are not documents.
fn validate_update_spec(update: &Document) -> PlugPortResult<()> {
    for (operator, payload) in update.iter() {
        match operator.as_str() {
            "$set" | "$inc" | "$unset" => {
                if payload.as_document().is_none() {
                    return Err(PlugPortError::new(
                        &format!("{} requires a document payload", operator),
                        ErrorKind::BadValue,
                    ));
                }
            }
            other => {
                return Err(PlugPortError::new(
                    &format!("Unknown update operator: {}", other),
                    ErrorKind::BadValue,
                ));
            }
        }
    }
    Ok(())
}

/// Applies `$set`, `$inc`, and `$unset` to a document, returning whether any
/// field actually changed.
fn apply_update_operators(document: &mut Document, update: &Document) -> PlugPortResult<bool> {
    let mut changed = false;
    for (operator, payload) in update.iter() {
        // validated as a document by validate_update_spec
        let fields = payload.as_document().expect("validated update payload");
        match operator.as_str() {
            "$set" => {
                for (field, value) in fields.iter() {
                    if field == DOC_ID {
                        if document.get(DOC_ID) != Some(value) {
                            return Err(PlugPortError::new(
                                "The _id field is immutable",
                                ErrorKind::BadValue,
                            ));
                        }
                        continue;
                    }
                    if document.get(field) != Some(value) {
                        document.put(field, value.clone())?;
                        changed = true;
                    }
                }
            }
            "$inc" => {
                for (field, delta) in fields.iter() {
                    if field == DOC_ID {
                        return Err(PlugPortError::new(
                            "The _id field is immutable",
                            ErrorKind::BadValue,
                        ));
                    }
                    let incremented = increment_value(document.get(field), delta, field)?;
                    if document.get(field) != Some(&incremented) {
                        document.put(field, incremented)?;
                        changed = true;
                    }
                }
            }
            "$unset" => {
                for (field, _) in fields.iter() {
                    if field == DOC_ID {
                        return Err(PlugPortError::new(
                            "The _id field is immutable",
                            ErrorKind::BadValue,
                        ));
                    }
                    if document.remove(field).is_some() {
                        changed = true;
                    }
                }
            }
            _ => unreachable!("validated update operator"),
        }
    }
    Ok(changed)
}

/// Adds a numeric delta to a field value, treating a missing field as zero.
/// Integer plus integer stays integral; any double makes the result a double.
fn increment_value(
    current: Option<&Value>,
    delta: &Value,
    field: &str,
) -> PlugPortResult<Value> {
    let current = current.cloned().unwrap_or(Value::Int(0));
    match (&current, delta) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.saturating_add(*b))),
        (Value::Int(a), Value::Double(b)) => Ok(Value::Double(*a as f64 + b)),
        (Value::Double(a), Value::Int(b)) => Ok(Value::Double(a + *b as f64)),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
        (_, Value::Int(_)) | (_, Value::Double(_)) => Err(PlugPortError::new(
            &format!(
                "Cannot apply $inc to non-numeric field {:?} of type {}",
                field,
                current.type_name()
            ),
            ErrorKind::BadValue,
        )),
        _ => Err(PlugPortError::new(
            &format!("$inc requires a numeric amount for field {:?}", field),
            ErrorKind::BadValue,
        )),
    }
}

/// Builds the document an upsert inserts: the filter stripped of operator
/// keys and operator-object values, merged with `$set` fields and `$inc`
/// amounts applied against missing-as-zero.
fn build_upsert_document(filter: &Document, update: &Document) -> PlugPortResult<Document> {
    let mut base = Document::new();
    for (field, value) in filter.iter() {
        if field.starts_with('$') {
            continue;
        }
        if let Value::Document(spec) = value {
            if spec.field_names().any(|k| k.starts_with('$')) {
                continue;
            }
        }
        base.put(field, value.clone())?;
    }

    if let Some(Value::Document(fields)) = update.get("$set") {
        for (field, value) in fields.iter() {
            base.put(field, value.clone())?;
        }
    }
    if let Some(Value::Document(fields)) = update.get("$inc") {
        for (field, delta) in fields.iter() {
            let incremented = increment_value(base.get(field), delta, field)?;
            base.put(field, incremented)?;
        }
    }
    Ok(base)
}
