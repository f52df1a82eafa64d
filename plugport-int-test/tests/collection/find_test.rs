use plugport::doc;
use plugport::errors::ErrorKind;
use plugport::query::{FindOptions, SortOrder};
use plugport::Value;
use plugport_int_test::test_util::{docs_with_ages, people_docs, test_store};

#[test]
fn test_find_on_missing_collection_returns_empty() {
    let store = test_store();
    let found = store
        .find("nowhere", &doc! { "a": 1i64 }, &FindOptions::new(), None)
        .unwrap();
    assert!(found.is_empty());
    assert_eq!(
        store.find_one("nowhere", &doc! {}, None, None).unwrap(),
        None
    );
}

#[test]
fn test_find_with_empty_filter_returns_all() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();
    let found = store
        .find("people", &doc! {}, &FindOptions::new(), None)
        .unwrap();
    assert_eq!(found.len(), 3);
}

#[test]
fn test_find_by_unindexed_field() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();
    let found = store
        .find(
            "people",
            &doc! { "last_name": "Doe" },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_limit_and_skip_preserve_scan_order() {
    let store = test_store();
    for i in 0..10i64 {
        store
            .insert_one("seq", doc! { "_id": (format!("{:02}", i)), "n": i }, None)
            .unwrap();
    }

    let limited = store
        .find("seq", &doc! {}, &FindOptions::new().with_limit(4), None)
        .unwrap();
    assert_eq!(limited.len(), 4);

    // with skip=s and limit=k and no sort, rows s+1..s+k in scan order
    let window = store
        .find(
            "seq",
            &doc! {},
            &FindOptions::new().with_skip(3).with_limit(4),
            None,
        )
        .unwrap();
    let ns: Vec<i64> = window
        .iter()
        .map(|d| d.get("n").unwrap().as_int().unwrap())
        .collect();
    assert_eq!(ns, vec![3, 4, 5, 6]);
}

#[test]
fn test_sort_descending_with_limit() {
    let store = test_store();
    store
        .insert_many("ages", docs_with_ages(&[18, 25, 30, 35, 40]), None)
        .unwrap();

    let found = store
        .find(
            "ages",
            &doc! {},
            &FindOptions::new()
                .order_by("age", SortOrder::Descending)
                .with_limit(3),
            None,
        )
        .unwrap();
    let ages: Vec<i64> = found
        .iter()
        .map(|d| d.get("age").unwrap().as_int().unwrap())
        .collect();
    assert_eq!(ages, vec![40, 35, 30]);
}

#[test]
fn test_multi_key_sort() {
    let store = test_store();
    store
        .insert_many(
            "people",
            vec![
                doc! { "group": "b", "rank": 2i64 },
                doc! { "group": "a", "rank": 2i64 },
                doc! { "group": "a", "rank": 1i64 },
            ],
            None,
        )
        .unwrap();

    let found = store
        .find(
            "people",
            &doc! {},
            &FindOptions::new()
                .order_by("group", SortOrder::Ascending)
                .order_by("rank", SortOrder::Descending),
            None,
        )
        .unwrap();
    let keys: Vec<(String, i64)> = found
        .iter()
        .map(|d| {
            (
                d.get("group").unwrap().as_string().unwrap().to_string(),
                d.get("rank").unwrap().as_int().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            ("a".to_string(), 2),
            ("a".to_string(), 1),
            ("b".to_string(), 2)
        ]
    );
}

#[test]
fn test_projection_modes() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let included = store
        .find(
            "people",
            &doc! {},
            &FindOptions::new().with_projection(doc! { "first_name": 1i64 }),
            None,
        )
        .unwrap();
    for document in &included {
        assert!(document.contains_field("first_name"));
        assert!(document.contains_field("_id"));
        assert!(!document.contains_field("age"));
    }

    let excluded = store
        .find(
            "people",
            &doc! {},
            &FindOptions::new().with_projection(doc! { "email": 0i64, "_id": 0i64 }),
            None,
        )
        .unwrap();
    for document in &excluded {
        assert!(!document.contains_field("email"));
        assert!(!document.contains_field("_id"));
        assert!(document.contains_field("first_name"));
    }

    let err = store
        .find(
            "people",
            &doc! {},
            &FindOptions::new().with_projection(doc! { "email": 0i64, "age": 1i64 }),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BadValue);
}

#[test]
fn test_dotted_path_filters() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let found = store
        .find(
            "people",
            &doc! { "address.city": "Springfield" },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(found.len(), 2);

    let none = store
        .find(
            "people",
            &doc! { "address.country": "Nowhere" },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_comparison_and_set_operators() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let adults = store
        .find(
            "people",
            &doc! { "age": { "$gt": 30i64 } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(adults.len(), 2);

    let not_jane = store
        .find(
            "people",
            &doc! { "first_name": { "$ne": "Jane" } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(not_jane.len(), 2);

    let listed = store
        .find(
            "people",
            &doc! { "first_name": { "$in": ["Jane", "Rick", "Ghost"] } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(listed.len(), 2);

    let with_email = store
        .find(
            "people",
            &doc! { "email": { "$exists": true } },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(with_email.len(), 3);
}

#[test]
fn test_logical_operators() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let found = store
        .find(
            "people",
            &doc! { "$and": [ { "last_name": "Doe" }, { "age": { "$lt": 30i64 } } ] },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].get("first_name"),
        Some(&Value::String("Jane".to_string()))
    );

    let found = store
        .find(
            "people",
            &doc! { "$or": [ { "first_name": "Rick" }, { "first_name": "Jane" } ] },
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_find_one_returns_first_match_or_none() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let one = store
        .find_one("people", &doc! { "last_name": "Doe" }, None, None)
        .unwrap();
    assert!(one.is_some());

    let none = store
        .find_one("people", &doc! { "last_name": "Ghost" }, None, None)
        .unwrap();
    assert!(none.is_none());

    let projected = store
        .find_one(
            "people",
            &doc! { "first_name": "Rick" },
            Some(doc! { "age": 1i64, "_id": 0i64 }),
            None,
        )
        .unwrap()
        .unwrap();
    assert_eq!(projected.len(), 1);
    assert_eq!(projected.get("age"), Some(&Value::Int(52)));
}

#[test]
fn test_count_documents() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    // empty filter uses the metadata counter
    assert_eq!(store.count_documents("people", &doc! {}, None).unwrap(), 3);
    // filtered counts run a real scan
    assert_eq!(
        store
            .count_documents("people", &doc! { "last_name": "Doe" }, None)
            .unwrap(),
        2
    );
    assert_eq!(
        store
            .count_documents("missing", &doc! {}, None)
            .unwrap(),
        0
    );
}

#[test]
fn test_malformed_filters_are_rejected() {
    let store = test_store();
    store.insert_many("people", people_docs(), None).unwrap();

    let err = store
        .find(
            "people",
            &doc! { "age": { "$regex": "x" } },
            &FindOptions::new(),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BadValue);

    let mut empty_or = plugport::common::Document::new();
    empty_or.put("$or", Value::Array(vec![])).unwrap();
    let err = store
        .find("people", &empty_or, &FindOptions::new(), None)
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::BadValue);
}
