use plugport::doc;
use plugport::errors::ErrorKind;
use plugport::query::FindOptions;
use plugport::store::UpdateOptions;
use plugport::Value;
use plugport_int_test::test_util::{people_docs, test_store};

#[test]
fn test_update_one_set() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let result = store
        .update_one(
            "people",
            &doc! { "first_name": "Jane" },
            &doc! { "$set": { "age": 29i64, "status": "active" } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);
    assert_eq!(result.upserted_id, None);

    let jane = store
        .find_one("people", &doc! { "first_name": "Jane" }, None, None)
        .unwrap()
        .unwrap();
    assert_eq!(jane.get("age"), Some(&Value::Int(29)));
    assert_eq!(jane.get("status"), Some(&Value::String("active".to_string())));
}

#[test]
fn test_update_many() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let result = store
        .update_many(
            "people",
            &doc! { "last_name": "Doe" },
            &doc! { "$set": { "family": "doe" } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(result.matched_count, 2);
    assert_eq!(result.modified_count, 2);

    let tagged = store
        .find("people", &doc! { "family": "doe" }, &FindOptions::new(), None)
        .unwrap();
    assert_eq!(tagged.len(), 2);
}

#[test]
fn test_update_with_no_effective_change_counts_matched_only() {
    let store = test_store();
    store
        .insert_one("people", doc! { "_id": "p1", "age": 10i64 }, None)
        .unwrap();

    let result = store
        .update_one(
            "people",
            &doc! { "_id": "p1" },
            &doc! { "$set": { "age": 10i64 } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 0);
}

#[test]
fn test_inc_against_missing_field_starts_at_zero() {
    let store = test_store();
    store
        .insert_one("stats", doc! { "_id": "s1" }, None)
        .unwrap();

    store
        .update_one(
            "stats",
            &doc! { "_id": "s1" },
            &doc! { "$inc": { "x": 1i64 } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();

    let doc = store
        .find_one("stats", &doc! { "_id": "s1" }, None, None)
        .unwrap()
        .unwrap();
    assert_eq!(doc.get("x"), Some(&Value::Int(1)));
}

#[test]
fn test_unset_removes_field() {
    let store = test_store();
    store
        .insert_one("people", doc! { "_id": "p1", "nick": "J", "age": 5i64 }, None)
        .unwrap();

    let result = store
        .update_one(
            "people",
            &doc! { "_id": "p1" },
            &doc! { "$unset": { "nick": 1i64 } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(result.modified_count, 1);

    let doc = store
        .find_one("people", &doc! { "_id": "p1" }, None, None)
        .unwrap()
        .unwrap();
    assert!(!doc.contains_field("nick"));
    assert!(doc.contains_field("age"));
}

#[test]
fn test_update_zero_matches_returns_zero_counts() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let result = store
        .update_one(
            "people",
            &doc! { "first_name": "Ghost" },
            &doc! { "$set": { "a": 1i64 } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(result.matched_count, 0);
    assert_eq!(result.modified_count, 0);

    // missing collection behaves the same
    let result = store
        .update_many(
            "nowhere",
            &doc! {},
            &doc! { "$set": { "a": 1i64 } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(result.matched_count, 0);
}

#[test]
fn test_upsert_creates_document_from_filter_and_update() {
    let store = test_store();

    let result = store
        .update_one(
            "people",
            &doc! { "name": "X", "age": { "$gte": 5i64 } },
            &doc! { "$set": { "age": 10i64 } },
            &UpdateOptions::upsert(),
            None,
        )
        .unwrap();
    assert_eq!(result.matched_count, 0);
    assert_eq!(result.modified_count, 0);
    let upserted_id = result.upserted_id.expect("upsert allocates an id");
    assert_eq!(upserted_id.len(), 24);

    let doc = store
        .find_one("people", &doc! { "name": "X" }, None, None)
        .unwrap()
        .unwrap();
    assert_eq!(doc.get("age"), Some(&Value::Int(10)));
    assert_eq!(doc.id(), Some(upserted_id.as_str()));
    assert_eq!(store.count_documents("people", &doc! {}, None).unwrap(), 1);
}

#[test]
fn test_upsert_does_not_fire_when_a_document_matches() {
    let store = test_store();
    store
        .insert_one("people", doc! { "name": "X", "age": 3i64 }, None)
        .unwrap();

    let result = store
        .update_one(
            "people",
            &doc! { "name": "X" },
            &doc! { "$inc": { "age": 1i64 } },
            &UpdateOptions::upsert(),
            None,
        )
        .unwrap();
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);
    assert_eq!(result.upserted_id, None);
    assert_eq!(store.count_documents("people", &doc! {}, None).unwrap(), 1);
}

#[test]
fn test_update_conflicting_with_unique_index_is_rejected() {
    let store = test_store();
    store.create_index("users", "email", true, None).unwrap();
    store
        .insert_one("users", doc! { "_id": "u1", "email": "a@x" }, None)
        .unwrap();
    store
        .insert_one("users", doc! { "_id": "u2", "email": "b@x" }, None)
        .unwrap();

    let err = store
        .update_one(
            "users",
            &doc! { "_id": "u2" },
            &doc! { "$set": { "email": "a@x" } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateKey);

    // u2 keeps its old value and index row
    let by_old = store
        .find("users", &doc! { "email": "b@x" }, &FindOptions::new(), None)
        .unwrap();
    assert_eq!(by_old.len(), 1);
}

#[test]
fn test_update_spec_validation() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let err = store
        .update_one(
            "people",
            &doc! { "first_name": "Jane" },
            &doc! { "age": 1i64 },
            &UpdateOptions::default(),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BadValue);

    let err = store
        .update_one(
            "people",
            &doc! { "first_name": "Jane" },
            &doc! { "$push": { "tags": "x" } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BadValue);

    let err = store
        .update_one(
            "people",
            &doc! { "first_name": "Jane" },
            &doc! { "$set": { "_id": "other" } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BadValue);
}

#[test]
fn test_update_then_find_sees_new_values_via_index() {
    let store = test_store();
    store.create_index("people", "age", false, None).unwrap();
    store
        .insert_one("people", doc! { "_id": "p1", "age": 30i64 }, None)
        .unwrap();

    store
        .update_one(
            "people",
            &doc! { "_id": "p1" },
            &doc! { "$inc": { "age": 5i64 } },
            &UpdateOptions::default(),
            None,
        )
        .unwrap();

    let found = store
        .find(
            "people",
            &doc! { "age": { "$gte": 34i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(found.len(), 1);

    let stale = store
        .find(
            "people",
            &doc! { "age": 30i64 },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert!(stale.is_empty());
}
