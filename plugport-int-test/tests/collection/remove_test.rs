use plugport::doc;
use plugport::kv::KvStore;
use plugport::query::FindOptions;
use plugport_int_test::test_util::{docs_with_ages, people_docs, test_store, test_store_with_kv};

#[test]
fn test_delete_one() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let result = store
        .delete_one("people", &doc! { "last_name": "Doe" }, None)
        .unwrap();
    assert_eq!(result.deleted_count, 1);
    assert_eq!(store.count_documents("people", &doc! {}, None).unwrap(), 2);

    let remaining = store
        .find("people", &doc! { "last_name": "Doe" }, &FindOptions::new(), None)
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn test_delete_many() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let result = store
        .delete_many("people", &doc! { "last_name": "Doe" }, None)
        .unwrap();
    assert_eq!(result.deleted_count, 2);
    assert_eq!(store.count_documents("people", &doc! {}, None).unwrap(), 1);
}

#[test]
fn test_delete_everything_with_empty_filter() {
    let store = test_store();
    store
        .insert_many("nums", docs_with_ages(&[1, 2, 3, 4, 5]), None)
        .unwrap();

    let result = store.delete_many("nums", &doc! {}, None).unwrap();
    assert_eq!(result.deleted_count, 5);
    assert_eq!(store.count_documents("nums", &doc! {}, None).unwrap(), 0);
    assert!(store
        .find("nums", &doc! {}, &FindOptions::new(), None)
        .unwrap()
        .is_empty());
}

#[test]
fn test_delete_on_missing_collection_returns_zero() {
    let store = test_store();
    let result = store.delete_one("nowhere", &doc! {}, None).unwrap();
    assert_eq!(result.deleted_count, 0);
    let result = store.delete_many("nowhere", &doc! { "a": 1i64 }, None).unwrap();
    assert_eq!(result.deleted_count, 0);
}

#[test]
fn test_delete_zero_matches() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();
    let result = store
        .delete_one("people", &doc! { "first_name": "Ghost" }, None)
        .unwrap();
    assert_eq!(result.deleted_count, 0);
    assert_eq!(store.count_documents("people", &doc! {}, None).unwrap(), 3);
}

#[test]
fn test_insert_then_delete_leaves_no_document_or_index_rows() {
    let (store, kv) = test_store_with_kv();
    store.create_index("users", "email", true, None).unwrap();
    store.create_index("users", "age", false, None).unwrap();
    store
        .insert_one(
            "users",
            doc! { "_id": "u1", "email": "a@x", "age": 30i64 },
            None,
        )
        .unwrap();

    assert_eq!(kv.count(Some(b"doc:users:")).unwrap(), 1);
    // one row each in _id_, email_1, age_1
    assert_eq!(kv.count(Some(b"idx:users:")).unwrap(), 3);

    store
        .delete_one("users", &doc! { "_id": "u1" }, None)
        .unwrap();

    assert_eq!(kv.count(Some(b"doc:users:")).unwrap(), 0);
    assert_eq!(kv.count(Some(b"idx:users:")).unwrap(), 0);
}

#[test]
fn test_deleted_documents_vanish_from_index_scans() {
    let store = test_store();
    store.create_index("nums", "age", false, None).unwrap();
    store
        .insert_many("nums", docs_with_ages(&[10, 20, 30]), None)
        .unwrap();

    store
        .delete_one("nums", &doc! { "age": 20i64 }, None)
        .unwrap();

    let found = store
        .find(
            "nums",
            &doc! { "age": { "$gte": 0i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    let ages: Vec<i64> = found
        .iter()
        .map(|d| d.get("age").unwrap().as_int().unwrap())
        .collect();
    assert_eq!(ages, vec![10, 30]);
}
