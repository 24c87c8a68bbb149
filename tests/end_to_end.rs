mod common;

use common::{document_name, emulator_firestore, ScriptedServer, DOCS};
use firestore_rest::{FirestoreErrorCode, MapValue};
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;

#[tokio::test]
async fn equality_query_returns_documents_in_received_order() {
    let server = MockServer::start();
    let body = format!(
        "{}\n{}\n",
        json!({ "document": {
            "name": document_name("users/p2"),
            "fields": { "role": { "stringValue": "food_provider" }, "created_at": { "integerValue": "20" } }
        }}),
        json!({ "document": {
            "name": document_name("users/p1"),
            "fields": { "role": { "stringValue": "food_provider" }, "created_at": { "integerValue": "10" } }
        }}),
    );
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{DOCS}:runQuery"))
            .header("content-type", "application/json")
            .json_body(json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "users" }],
                    "where": { "fieldFilter": {
                        "field": { "fieldPath": "role" },
                        "op": "EQUAL",
                        "value": { "stringValue": "food_provider" }
                    }},
                    "orderBy": [{ "field": { "fieldPath": "created_at" }, "direction": "DESCENDING" }],
                    "limit": 3
                }
            }));
        then.status(200).body(body);
    });

    let firestore = emulator_firestore(&server.address().to_string(), 2);
    let snapshot = firestore
        .collection("users")
        .unwrap()
        .where_field("role", "=", "food_provider")
        .unwrap()
        .order_by("created_at", "desc")
        .unwrap()
        .limit(3)
        .documents()
        .await
        .unwrap();

    mock.assert();
    assert_eq!(snapshot.len(), 2);
    let ids: Vec<_> = snapshot.iter().map(|doc| doc.id()).collect();
    assert_eq!(ids, vec!["p2", "p1"]);
    assert!(snapshot.iter().all(|doc| doc.exists()));
    assert_eq!(
        snapshot.documents()[0].get("created_at").and_then(|v| v.as_i64()),
        Some(20)
    );
}

#[tokio::test]
async fn missing_document_yields_non_existent_snapshot() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("{DOCS}/users/missing-id"));
        then.status(404).json_body(json!({
            "error": { "code": 404, "message": "Document not found", "status": "NOT_FOUND" }
        }));
    });

    let firestore = emulator_firestore(&server.address().to_string(), 2);
    let snapshot = firestore
        .collection("users")
        .unwrap()
        .document("missing-id")
        .unwrap()
        .snapshot()
        .await
        .unwrap();

    assert_eq!(snapshot.id(), "missing-id");
    assert!(!snapshot.exists());
    assert!(snapshot.data().is_empty());
}

#[tokio::test]
async fn document_id_with_hash_reads_that_document() {
    let server = MockServer::start();
    let other = server.mock(|when, then| {
        when.path(format!("{DOCS}/users/a"));
        then.status(200).json_body(json!({
            "name": document_name("users/a"),
            "fields": { "owner": { "stringValue": "someone else" } }
        }));
    });
    let wanted = server.mock(|when, then| {
        when.method(GET).path(format!("{DOCS}/users/a%23b"));
        then.status(404).json_body(json!({
            "error": { "code": 404, "message": "Document not found", "status": "NOT_FOUND" }
        }));
    });

    let firestore = emulator_firestore(&server.address().to_string(), 2);
    let snapshot = firestore
        .collection("users")
        .unwrap()
        .document("a#b")
        .unwrap()
        .snapshot()
        .await
        .unwrap();

    assert_eq!(other.hits(), 0);
    wanted.assert();
    assert_eq!(snapshot.id(), "a#b");
    assert!(!snapshot.exists());
}

#[tokio::test]
async fn update_document_patches_only_named_fields() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{DOCS}/listings/L1"))
            .query_param("updateMask.fieldPaths", "status")
            .json_body(json!({ "fields": { "status": { "stringValue": "hidden" } } }));
        then.status(200).json_body(json!({
            "name": document_name("listings/L1"),
            "fields": {
                "status": { "stringValue": "hidden" },
                "title": { "stringValue": "Day-old bread" }
            }
        }));
    });

    let firestore = emulator_firestore(&server.address().to_string(), 2);
    firestore
        .update_document(
            "listings",
            "L1",
            MapValue::from_json(json!({ "status": "hidden" })).unwrap(),
        )
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn unsupported_operator_fails_before_any_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(200).body("[]");
    });

    let firestore = emulator_firestore(&server.address().to_string(), 2);
    let err = firestore
        .collection("listings")
        .unwrap()
        .where_field("quantity", ">", 3)
        .unwrap_err();

    assert_eq!(err.code, FirestoreErrorCode::UnsupportedOperator);
    assert_eq!(mock.hits(), 0);
}

fn flaky_script() -> Vec<(u16, String)> {
    let unavailable = json!({ "error": { "code": 503, "message": "try later", "status": "UNAVAILABLE" } });
    let document = json!({
        "name": document_name("listings/L1"),
        "fields": { "status": { "stringValue": "live" } }
    });
    vec![
        (503, unavailable.to_string()),
        (503, unavailable.to_string()),
        (200, document.to_string()),
    ]
}

#[tokio::test]
async fn two_failures_exhaust_a_two_attempt_budget() {
    let server = ScriptedServer::start(flaky_script()).await;
    let firestore = emulator_firestore(&server.host(), 2);

    let err = firestore
        .document("listings/L1")
        .unwrap()
        .snapshot()
        .await
        .unwrap_err();

    assert_eq!(err.code, FirestoreErrorCode::Transport);
    assert_eq!(err.http_status(), Some(503));
    assert!(err.body().unwrap().contains("try later"));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn third_attempt_succeeds_with_a_three_attempt_budget() {
    let server = ScriptedServer::start(flaky_script()).await;
    let firestore = emulator_firestore(&server.host(), 3);

    let snapshot = firestore
        .document("listings/L1")
        .unwrap()
        .snapshot()
        .await
        .unwrap();

    assert!(snapshot.exists());
    assert_eq!(snapshot.get("status").and_then(|v| v.as_str()), Some("live"));
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn add_returns_server_assigned_id() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{DOCS}/donations"))
            .json_body(json!({ "fields": {
                "item": { "stringValue": "apples" },
                "kg": { "doubleValue": 2.5 }
            }}));
        then.status(200).json_body(json!({
            "name": document_name("donations/Xy12"),
            "fields": {}
        }));
    });

    let firestore = emulator_firestore(&server.address().to_string(), 2);
    let id = firestore
        .collection("donations")
        .unwrap()
        .add(MapValue::from_json(json!({ "item": "apples", "kg": 2.5 })).unwrap())
        .await
        .unwrap();

    mock.assert();
    assert_eq!(id, "Xy12");
}
