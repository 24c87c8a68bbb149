mod common;

use common::{document_name, DOCS};
use firestore_rest::blocking::BlockingFirestore;
use firestore_rest::FirestoreSettings;
use httpmock::prelude::*;
use serde_json::json;

#[test]
fn blocking_client_reads_documents() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{DOCS}/users/u1"));
        then.status(200).json_body(json!({
            "name": document_name("users/u1"),
            "fields": { "name": { "stringValue": "Corner Bakery" } }
        }));
    });

    let firestore = BlockingFirestore::new(
        FirestoreSettings::new("food-rescue").with_emulator_host(server.address().to_string()),
    )
    .unwrap();
    let snapshot = firestore.document("users/u1").unwrap().snapshot().unwrap();

    mock.assert();
    assert_eq!(snapshot.to_json(), json!({ "name": "Corner Bakery" }));
}
