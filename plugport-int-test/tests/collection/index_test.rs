use plugport::doc;
use plugport::errors::ErrorKind;
use plugport::query::FindOptions;
use plugport_int_test::test_util::{docs_with_ages, test_store};

fn ages_of(documents: &[plugport::common::Document]) -> Vec<i64> {
    documents
        .iter()
        .map(|d| d.get("age").unwrap().as_int().unwrap())
        .collect()
}

#[test]
fn test_create_index_and_list() {
    let store = test_store();
    store
        .insert_one("users", doc! { "age": 30i64 }, None)
        .unwrap();

    let name = store.create_index("users", "age", false, None).unwrap();
    assert_eq!(name, "age_1");

    let indexes = store.list_indexes("users").unwrap();
    let names: Vec<&str> = indexes.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["_id_", "age_1"]);
    assert!(indexes[0].unique);
    assert!(!indexes[1].unique);

    // creating the same index again returns the existing one
    let again = store.create_index("users", "age", true, None).unwrap();
    assert_eq!(again, "age_1");
    assert_eq!(store.list_indexes("users").unwrap().len(), 2);
}

#[test]
fn test_range_scan_via_index() {
    let store = test_store();
    store
        .insert_many("people", docs_with_ages(&[18, 25, 30, 35, 40]), None)
        .unwrap();
    store.create_index("people", "age", false, None).unwrap();

    let found = store
        .find(
            "people",
            &doc! { "age": { "$gte": 25i64, "$lt": 40i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(ages_of(&found), vec![25, 30, 35]);
}

#[test]
fn test_index_created_before_inserts() {
    let store = test_store();
    store.create_index("people", "age", false, None).unwrap();
    store
        .insert_many("people", docs_with_ages(&[5, 3, 9]), None)
        .unwrap();

    let found = store
        .find(
            "people",
            &doc! { "age": { "$gt": 0i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    // no sort requested: index scan order is numeric order
    assert_eq!(ages_of(&found), vec![3, 5, 9]);
}

#[test]
fn test_number_sort_preservation_across_signs() {
    let store = test_store();
    store
        .insert_many("nums", docs_with_ages(&[-100, -10, -1, 0, 1, 10, 100]), None)
        .unwrap();
    store.create_index("nums", "age", false, None).unwrap();

    let found = store
        .find(
            "nums",
            &doc! { "age": { "$gte": -1000i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(ages_of(&found), vec![-100, -10, -1, 0, 1, 10, 100]);
}

#[test]
fn test_double_and_integer_values_interleave_in_index_order() {
    let store = test_store();
    store
        .insert_many(
            "nums",
            vec![
                doc! { "age": 2i64 },
                doc! { "age": 1.5f64 },
                doc! { "age": -0.5f64 },
                doc! { "age": 1i64 },
            ],
            None,
        )
        .unwrap();
    store.create_index("nums", "age", false, None).unwrap();

    let found = store
        .find(
            "nums",
            &doc! { "age": { "$gte": -10i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    let values: Vec<f64> = found
        .iter()
        .map(|d| d.get("age").unwrap().as_number().unwrap())
        .collect();
    assert_eq!(values, vec![-0.5, 1.0, 1.5, 2.0]);
}

#[test]
fn test_unique_index_violation_on_insert() {
    let store = test_store();
    store.create_index("users", "email", true, None).unwrap();

    store
        .insert_one("users", doc! { "email": "a@x" }, None)
        .unwrap();
    let err = store
        .insert_one("users", doc! { "email": "a@x" }, None)
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
    assert_eq!(err.code(), 11000);
    assert!(err.message().contains("a@x"));
    assert!(err.message().contains("email_1"));

    assert_eq!(store.count_documents("users", &doc! {}, None).unwrap(), 1);
}

#[test]
fn test_unique_index_allows_distinct_values_and_nulls() {
    let store = test_store();
    store.create_index("users", "email", true, None).unwrap();

    store
        .insert_one("users", doc! { "email": "a@x" }, None)
        .unwrap();
    store
        .insert_one("users", doc! { "email": "b@x" }, None)
        .unwrap();
    // absent and null values produce no index rows, so they never collide
    store.insert_one("users", doc! { "name": "n1" }, None).unwrap();
    store.insert_one("users", doc! { "name": "n2" }, None).unwrap();
    store
        .insert_one("users", doc! { "email": (plugport::Value::Null) }, None)
        .unwrap();

    assert_eq!(store.count_documents("users", &doc! {}, None).unwrap(), 5);
}

#[test]
fn test_retroactive_unique_build_fails_on_existing_duplicates() {
    let store = test_store();
    store
        .insert_many(
            "users",
            vec![doc! { "email": "dup@x" }, doc! { "email": "dup@x" }],
            None,
        )
        .unwrap();

    let err = store.create_index("users", "email", true, None).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateKey);

    // the failed index is not registered
    let names: Vec<String> = store
        .list_indexes("users")
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["_id_".to_string()]);
}

#[test]
fn test_drop_index() {
    let store = test_store();
    store
        .insert_many("people", docs_with_ages(&[1, 2, 3]), None)
        .unwrap();
    store.create_index("people", "age", false, None).unwrap();

    assert!(store.drop_index("people", "age_1", None).unwrap());
    let names: Vec<String> = store
        .list_indexes("people")
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["_id_".to_string()]);

    // queries still work through a collection scan
    let found = store
        .find(
            "people",
            &doc! { "age": { "$gte": 2i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_drop_id_index_is_refused() {
    let store = test_store();
    store
        .insert_one("users", doc! { "a": 1i64 }, None)
        .unwrap();

    let err = store.drop_index("users", "_id_", None).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidLength);
    assert_eq!(err.code(), 21);
}

#[test]
fn test_drop_missing_index() {
    let store = test_store();

    // missing collection: not an error, nothing dropped
    assert!(!store.drop_index("nowhere", "age_1", None).unwrap());

    store
        .insert_one("users", doc! { "a": 1i64 }, None)
        .unwrap();
    let err = store.drop_index("users", "age_1", None).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::IndexNotFound);
    assert_eq!(err.code(), 27);
}

#[test]
fn test_index_rows_follow_updates() {
    let store = test_store();
    store.create_index("users", "email", true, None).unwrap();
    store
        .insert_one("users", doc! { "_id": "u1", "email": "old" }, None)
        .unwrap();

    store
        .update_one(
            "users",
            &doc! { "_id": "u1" },
            &doc! { "$set": { "email": "new" } },
            &Default::default(),
            None,
        )
        .unwrap();

    let by_old = store
        .find("users", &doc! { "email": "old" }, &FindOptions::new(), None)
        .unwrap();
    assert!(by_old.is_empty());

    let by_new = store
        .find("users", &doc! { "email": "new" }, &FindOptions::new(), None)
        .unwrap();
    assert_eq!(by_new.len(), 1);
    assert_eq!(by_new[0].id(), Some("u1"));
}
