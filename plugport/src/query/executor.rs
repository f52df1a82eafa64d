use crate::common::cancel::{check_cancelled, CancellationToken};
use crate::common::constants::{
    DEFAULT_FIND_LIMIT, DOC_ID, KEY_LOWER_SUCCESSOR, SCAN_CHUNK_SIZE, SORT_EVAL_CAP,
};
use crate::common::document::Document;
use crate::common::value::Value;
use crate::errors::{ErrorKind, PlugPortError, PlugPortResult};
use crate::index::encoding::{decode_index_key, document_key, document_prefix};
use crate::kv::{KvStore, KvStoreRef, ScanOptions};
use crate::query::matcher;
use crate::query::planner::{FindPlan, ScanPlan};
use crate::query::{FindOptions, SortOrder};
use std::cmp::Ordering;
use std::sync::Arc;

/// Drives a chosen plan against the substrate and applies the
/// sort/skip/limit/projection pipeline.
///
/// Scans run in bounded chunks, advancing the start key to
/// `lastSeenKey ∥ 0x00` between chunks, and stop early once enough documents
/// are collected. On index scans a missing document row is skipped: readers
/// may observe a prefix of a concurrent mutation, and the post-filter always
/// re-validates against the current document.
#[derive(Clone)]
pub struct QueryExecutor {
    inner: Arc<QueryExecutorInner>,
}

impl QueryExecutor {
    pub fn new(kv: KvStoreRef) -> Self {
        QueryExecutor {
            inner: Arc::new(QueryExecutorInner { kv }),
        }
    }

    /// Executes a plan and returns the result documents in final order.
    pub fn execute(
        &self,
        collection: &str,
        plan: &FindPlan,
        filter: &Document,
        options: &FindOptions,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Vec<Document>> {
        self.inner.execute(collection, plan, filter, options, cancel)
    }
}

struct QueryExecutorInner {
    kv: KvStoreRef,
}

impl QueryExecutorInner {
    fn execute(
        &self,
        collection: &str,
        plan: &FindPlan,
        filter: &Document,
        options: &FindOptions,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Vec<Document>> {
        // the store clamps find limits; internal callers (count, bulk
        // update) pass their own caps
        let limit = match options.limit {
            Some(limit) => limit,
            None if options.sort.is_empty() => DEFAULT_FIND_LIMIT,
            None => SORT_EVAL_CAP,
        };
        let skip = options.skip.unwrap_or(0);
        // a sort must see every candidate before slicing, up to the sort cap
        let max_needed = if options.sort.is_empty() {
            skip.saturating_add(limit)
        } else {
            SORT_EVAL_CAP
        };

        let mut documents = match &plan.scan {
            ScanPlan::CollectionScan => self.collection_scan(
                collection,
                filter,
                plan.needs_post_filter,
                max_needed,
                cancel,
            )?,
            ScanPlan::IndexScan { range, .. } => self.index_scan(
                collection,
                &range.start,
                &range.end,
                filter,
                plan.needs_post_filter,
                max_needed,
                cancel,
            )?,
        };

        if !options.sort.is_empty() {
            sort_documents(&mut documents, &options.sort);
        }
        if skip > 0 {
            documents.drain(..skip.min(documents.len()));
        }
        documents.truncate(limit);

        match &options.projection {
            Some(projection) if !projection.is_empty() => {
                apply_projection(documents, projection)
            }
            _ => Ok(documents),
        }
    }

    fn collection_scan(
        &self,
        collection: &str,
        filter: &Document,
        needs_post_filter: bool,
        max_needed: usize,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Vec<Document>> {
        let prefix = document_prefix(collection);
        let mut start = prefix.clone();
        let mut documents = Vec::new();

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
                let document = Document::from_bytes(&entry.value)?;
                if needs_post_filter && !matcher::matches(&document, filter)? {
                    continue;
                }
                documents.push(document);
                if documents.len() >= max_needed {
                    return Ok(documents);
                }
            }

            if entries.len() < SCAN_CHUNK_SIZE {
                return Ok(documents);
            }
            start = entries.last().map(|e| e.key.clone()).unwrap_or_default();
            start.push(KEY_LOWER_SUCCESSOR);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn index_scan(
        &self,
        collection: &str,
        range_start: &[u8],
        range_end: &[u8],
        filter: &Document,
        needs_post_filter: bool,
        max_needed: usize,
        cancel: Option<&CancellationToken>,
    ) -> PlugPortResult<Vec<Document>> {
        let mut start = range_start.to_vec();
        let mut documents = Vec::new();

        loop {
            check_cancelled(cancel)?;
            let entries = self.kv.scan(
                ScanOptions::with_range(start.clone(), range_end.to_vec())
                    .limit(SCAN_CHUNK_SIZE),
            )?;

            for entry in &entries {
                let Some((_, id)) = decode_index_key(&entry.key) else {
                    continue;
                };
                // a concurrent writer may not have stored the document yet
                let Some(bytes) = self.kv.get(&document_key(collection, &id))? else {
                    continue;
                };
                let document = Document::from_bytes(&bytes)?;
                if needs_post_filter && !matcher::matches(&document, filter)? {
                    continue;
                }
                documents.push(document);
                if documents.len() >= max_needed {
                    return Ok(documents);
                }
            }

            if entries.len() < SCAN_CHUNK_SIZE {
                return Ok(documents);
            }
            start = entries.last().map(|e| e.key.clone()).unwrap_or_default();
            start.push(KEY_LOWER_SUCCESSOR);
        }
    }
}

/// Stable multi-key sort: compare by each sort entry in order, nulls and
/// absent values before any non-null value, numeric pairs numerically,
/// everything else by code-point comparison of the stringified values.
fn sort_documents(documents: &mut [Document], sort: &[(String, SortOrder)]) {
    documents.sort_by(|a, b| {
        for (field, order) in sort {
            let ordering = compare_sort_values(a.get_path(field), b.get_path(field));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_sort_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a_null = a.map_or(true, |v| v.is_null());
    let b_null = b.map_or(true, |v| v.is_null());
    match (a_null, b_null) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => {
            let a = a.unwrap();
            let b = b.unwrap();
            if a.is_number() && b.is_number() {
                let x = a.as_number().unwrap_or(f64::NAN);
                let y = b.as_number().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            } else {
                a.to_string().cmp(&b.to_string())
            }
        }
    }
}

/// Applies a projection to every result document.
///
/// A projection is either pure include (`{f:1}`: only listed fields plus
/// `_id` unless `_id:0`) or pure exclude (`{f:0}`); mixing the modes is
/// rejected.
fn apply_projection(
    documents: Vec<Document>,
    projection: &Document,
) -> PlugPortResult<Vec<Document>> {
    let mut include_id = true;
    let mut mode: Option<bool> = None;

    for (field, flag) in projection.iter() {
        let include = !flag.is_falsy();
        if field == DOC_ID {
            include_id = include;
            continue;
        }
        match mode {
            None => mode = Some(include),
            Some(current) if current != include => {
                return Err(PlugPortError::new(
                    "Cannot mix include and exclude fields in one projection",
                    ErrorKind::BadValue,
                ));
            }
            _ => {}
        }
    }

    // an `_id`-only projection defaults to include mode
    let include_mode = mode.unwrap_or(true);

    let projected = documents
        .into_iter()
        .map(|document| project_one(document, projection, include_mode, include_id))
        .collect();
    Ok(projected)
}

fn project_one(
    document: Document,
    projection: &Document,
    include_mode: bool,
    include_id: bool,
) -> Document {
    let mut result = Document::new();
    for (field, value) in document.iter() {
        let listed = projection.contains_field(field);
        let keep = if field == DOC_ID {
            include_id
        } else if include_mode {
            listed
        } else {
            !listed
        };
        if keep {
            // field names were validated non-empty on the way in
            let _ = result.put(field, value.clone());
        }
    }
    result
}
