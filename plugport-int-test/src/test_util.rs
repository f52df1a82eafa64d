use plugport::doc;
use plugport::common::Document;
use plugport::kv::InMemoryKv;
use plugport::store::DocumentStore;
use std::sync::{Arc, Once};

static INIT_LOGGING: Once = Once::new();

/// Initializes logging once for the whole test binary. Controlled by
/// `RUST_LOG` as usual.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a fresh in-memory store for a test.
pub fn test_store() -> DocumentStore {
    init_logging();
    DocumentStore::in_memory()
}

/// Creates a store together with a handle to its backing substrate, for
/// tests that assert on raw keyspace contents.
pub fn test_store_with_kv() -> (DocumentStore, Arc<InMemoryKv>) {
    init_logging();
    let kv = Arc::new(InMemoryKv::new());
    let store = DocumentStore::new(kv.clone());
    (store, kv)
}

/// A small fixed set of people documents used across tests.
pub fn people_docs() -> Vec<Document> {
    vec![
        doc! {
            "first_name": "John",
            "last_name": "Doe",
            "age": 35i64,
            "email": "john@example.com",
            "address": { "city": "Springfield", "zip": 11001i64 }
        },
        doc! {
            "first_name": "Jane",
            "last_name": "Doe",
            "age": 28i64,
            "email": "jane@example.com",
            "address": { "city": "Shelbyville", "zip": 11002i64 }
        },
        doc! {
            "first_name": "Rick",
            "last_name": "Moore",
            "age": 52i64,
            "email": "rick@example.com",
            "address": { "city": "Springfield", "zip": 11003i64 }
        },
    ]
}

/// Documents with ascending `age` values, one per value.
pub fn docs_with_ages(ages: &[i64]) -> Vec<Document> {
    ages.iter()
        .map(|age| {
            let mut doc = Document::new();
            doc.put("age", *age).unwrap();
            doc
        })
        .collect()
}
