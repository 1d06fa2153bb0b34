// Tests for entry/instance lifecycle and catalog resolution, using
// wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use serialmfg::api::types::DataType;
use serialmfg::{DatasetSpec, Error, OperatorFilter, SerialClient};
use serialmfg_api::ApiClient;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, SerialClient) {
    let server = MockServer::start().await;
    let api = ApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, SerialClient::with_api_client(api, Some("station-7".into())))
}

fn instance_json(id: Uuid, identifier: &str) -> serde_json::Value {
    json!({
        "id": id,
        "identifier": identifier,
        "component_id": Uuid::new_v4(),
        "part_number_id": null,
        "status": "WIP",
        "created_at": "2024-06-01T08:00:00Z",
        "last_updated_at": null,
    })
}

fn entry_json(id: Uuid, process_id: Uuid, instance_id: Uuid) -> serde_json::Value {
    json!({
        "id": id,
        "process_id": process_id,
        "unique_identifier_id": instance_id,
        "station_id": "station-7",
        "is_complete": false,
    })
}

// ── Entry creation preconditions ────────────────────────────────────

#[tokio::test]
async fn test_create_entry_without_instance_fails_before_any_request() {
    let (server, client) = setup().await;

    let err = client
        .entries()
        .create(Uuid::new_v4())
        .send()
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::InvalidArgument { .. }),
        "expected InvalidArgument, got: {err:?}"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_entry_with_bad_timestamp_fails_before_any_request() {
    let (server, client) = setup().await;

    let err = client
        .entries()
        .create(Uuid::new_v4())
        .component_instance_id(Uuid::new_v4())
        .timestamp("June 1st 2024")
        .send()
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::InvalidArgument { .. }),
        "expected InvalidArgument, got: {err:?}"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_entry_resolves_identifier_and_falls_back_to_client_station() {
    let (server, client) = setup().await;

    let process_id = Uuid::new_v4();
    let instance_id = Uuid::new_v4();
    let entry_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/components/instances"))
        .and(query_param("identifier", "SN-0042"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([instance_json(instance_id, "SN-0042")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/processes/entries"))
        .and(body_partial_json(json!({
            "component_instance_id": instance_id,
            "process_id": process_id,
            "station_id": "station-7",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(entry_json(entry_id, process_id, instance_id)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let entry = client
        .entries()
        .create(process_id)
        .component_instance_identifier("SN-0042")
        .send()
        .await
        .unwrap();

    assert_eq!(entry.id(), entry_id);
    assert_eq!(entry.component_instance_id(), instance_id);
}

#[tokio::test]
async fn test_create_entry_explicit_id_skips_identifier_lookup() {
    let (server, client) = setup().await;

    let process_id = Uuid::new_v4();
    let instance_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/components/instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/processes/entries"))
        .and(body_partial_json(json!({ "component_instance_id": instance_id })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(entry_json(Uuid::new_v4(), process_id, instance_id)),
        )
        .expect(1)
        .mount(&server)
        .await;

    client
        .entries()
        .create(process_id)
        .component_instance_id(instance_id)
        .component_instance_identifier("SN-IGNORED")
        .send()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_entries_get_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/processes/entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = client.entries().get(Uuid::new_v4()).await.unwrap_err();
    assert!(
        matches!(err, Error::ProcessEntryNotFound { .. }),
        "expected ProcessEntryNotFound, got: {err:?}"
    );
}

#[tokio::test]
async fn test_entries_list_passes_filters_through() {
    let (server, client) = setup().await;

    let instance_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/processes/entries"))
        .and(query_param("component_instance_id", instance_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            entry_json(Uuid::new_v4(), Uuid::new_v4(), instance_id),
            entry_json(Uuid::new_v4(), Uuid::new_v4(), instance_id),
        ])))
        .mount(&server)
        .await;

    let entries = client
        .entries()
        .list(&[("component_instance_id", instance_id.to_string())])
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.component_instance_id() == instance_id));
}

// ── Component instances ─────────────────────────────────────────────

#[tokio::test]
async fn test_instance_get_roundtrips_identifier() {
    let (server, client) = setup().await;

    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/components/instances"))
        .and(query_param("identifier", "SN-0042"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([instance_json(id, "SN-0042")])),
        )
        .mount(&server)
        .await;

    let instance = client.instances().get("SN-0042").await.unwrap();
    assert_eq!(instance.identifier(), "SN-0042");
    assert_eq!(instance.id(), id);
}

#[tokio::test]
async fn test_instance_get_missing_and_duplicate_identifiers() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/components/instances"))
        .and(query_param("identifier", "SN-MISSING"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/components/instances"))
        .and(query_param("identifier", "SN-DUPED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            instance_json(Uuid::new_v4(), "SN-DUPED"),
            instance_json(Uuid::new_v4(), "SN-DUPED"),
        ])))
        .mount(&server)
        .await;

    let err = client.instances().get("SN-MISSING").await.unwrap_err();
    assert!(matches!(err, Error::ComponentInstanceNotFound { .. }));

    let err = client.instances().get("SN-DUPED").await.unwrap_err();
    match err {
        Error::AmbiguousIdentifier { identifier, count } => {
            assert_eq!(identifier, "SN-DUPED");
            assert_eq!(count, 2);
        }
        other => panic!("expected AmbiguousIdentifier, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_instance_create_resolves_component_and_part_number() {
    let (server, client) = setup().await;

    let component_id = Uuid::new_v4();
    let part_number_id = Uuid::new_v4();
    let instance_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/components"))
        .and(query_param("name", "Widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": component_id,
            "name": "Widget",
        }])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/part-numbers"))
        .and(query_param("part_number", "PN-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/part-numbers"))
        .and(body_partial_json(json!({
            "part_number": "PN-9",
            "component_id": component_id,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": part_number_id,
            "part_number": "PN-9",
            "component_id": component_id,
            "description": null,
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/components/instances"))
        .and(body_partial_json(json!({
            "component_id": component_id,
            "identifier": "SN-NEW",
            "part_number_id": part_number_id,
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(instance_json(instance_id, "SN-NEW")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let instance = client
        .instances()
        .create("SN-NEW", "Widget", Some("PN-9"))
        .await
        .unwrap();

    assert_eq!(instance.id(), instance_id);
    assert_eq!(instance.identifier(), "SN-NEW");
}

#[tokio::test]
async fn test_instance_create_unknown_component_aborts() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/components"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = client
        .instances()
        .create("SN-NEW", "No Such Component", None)
        .await
        .unwrap_err();

    match err {
        Error::ComponentNotFound { name } => assert_eq!(name, "No Such Component"),
        other => panic!("expected ComponentNotFound, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_instance_add_link_requires_existing_dataset() {
    let (server, client) = setup().await;

    let parent_id = Uuid::new_v4();
    let child_id = Uuid::new_v4();
    let dataset_id = Uuid::new_v4();
    let process_id = Uuid::new_v4();
    let entry_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/components/instances"))
        .and(query_param("identifier", "SN-PARENT"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([instance_json(parent_id, "SN-PARENT")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/processes/entries"))
        .and(query_param("id", entry_id.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([entry_json(entry_id, process_id, parent_id)])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/components/instances"))
        .and(query_param("identifier", "CHILD-001"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([instance_json(child_id, "CHILD-001")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .and(query_param("name", "Main Assembly"))
        .and(query_param("type", "LINK"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": dataset_id,
            "name": "Main Assembly",
            "type": "LINK",
            "process_id": process_id,
        }])))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/components/instances/links"))
        .and(body_partial_json(json!({
            "parent_component_instance_id": parent_id,
            "child_component_instance_id": child_id,
            "break_prior_links": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "new_link": {
                "id": Uuid::new_v4(),
                "parent_component_instance_id": parent_id,
                "child_component_instance_id": child_id,
                "dataset_id": dataset_id,
                "process_entry_id": entry_id,
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let parent = client.instances().get("SN-PARENT").await.unwrap();
    let entry = client.entries().get(entry_id).await.unwrap();

    let link = parent
        .add_link("Main Assembly", "CHILD-001", false, &entry)
        .await
        .unwrap();

    assert_eq!(link.new_link.parent_component_instance_id, parent_id);
    assert_eq!(link.new_link.child_component_instance_id, child_id);
}

// ── Dataset get-or-create ───────────────────────────────────────────

#[tokio::test]
async fn test_get_or_create_dataset_is_idempotent_for_the_caller() {
    let (server, client) = setup().await;

    let process_id = Uuid::new_v4();
    let dataset_id = Uuid::new_v4();
    let dataset_body = json!([{
        "id": dataset_id,
        "name": "Pi Approx",
        "type": "NUMERICAL",
        "process_id": process_id,
    }]);

    // First lookup misses, so the dataset gets created; the second
    // lookup hits.
    Mock::given(method("GET"))
        .and(path("/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&dataset_body))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/datasets"))
        .and(body_partial_json(json!({ "name": "Pi Approx", "type": "NUMERICAL" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": dataset_id,
            "name": "Pi Approx",
            "type": "NUMERICAL",
            "process_id": process_id,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let datasets = client.datasets();
    let spec = DatasetSpec::default();

    let first = datasets
        .get_or_create("Pi Approx", DataType::Numerical, process_id, &spec)
        .await
        .unwrap();
    let second = datasets
        .get_or_create("Pi Approx", DataType::Numerical, process_id, &spec)
        .await
        .unwrap();

    assert_eq!(first.id, dataset_id);
    assert_eq!(second.id, dataset_id);
}

#[tokio::test]
async fn test_get_or_create_dataset_conflict_falls_back_to_get() {
    let (server, client) = setup().await;

    let process_id = Uuid::new_v4();
    let dataset_id = Uuid::new_v4();

    // Someone else creates the dataset between our get and our create:
    // the first get misses, the create conflicts, the retry get hits.
    Mock::given(method("GET"))
        .and(path("/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": dataset_id,
            "name": "Pi Approx",
            "type": "NUMERICAL",
            "process_id": process_id,
        }])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/datasets"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "already exists" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dataset = client
        .datasets()
        .get_or_create(
            "Pi Approx",
            DataType::Numerical,
            process_id,
            &DatasetSpec::default(),
        )
        .await
        .unwrap();

    assert_eq!(dataset.id, dataset_id);
}

#[tokio::test]
async fn test_get_or_create_dataset_race_lost_when_both_attempts_miss() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/datasets"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "already exists" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .datasets()
        .get_or_create(
            "Ghost",
            DataType::Text,
            Uuid::new_v4(),
            &DatasetSpec::default(),
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::RaceLost { .. }),
        "expected RaceLost, got: {err:?}"
    );
}

// ── Operators ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_operator_lookup_by_pin() {
    let (server, client) = setup().await;

    let operator_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/operators"))
        .and(query_param("pin", "1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": operator_id,
            "first_name": "Grace",
            "last_name": "Hopper",
        }])))
        .mount(&server)
        .await;

    let operator = client
        .operators()
        .get(&OperatorFilter {
            pin: Some("1234".into()),
            ..OperatorFilter::default()
        })
        .await
        .unwrap();

    assert_eq!(operator.id, operator_id);
    assert_eq!(operator.first_name.as_deref(), Some("Grace"));
}

#[tokio::test]
async fn test_operator_lookup_zero_and_many() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/operators"))
        .and(query_param("last_name", "Nobody"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operators"))
        .and(query_param("first_name", "Alex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4(), "first_name": "Alex", "last_name": "Ng" },
            { "id": Uuid::new_v4(), "first_name": "Alex", "last_name": "Wu" },
        ])))
        .mount(&server)
        .await;

    let err = client
        .operators()
        .get(&OperatorFilter {
            last_name: Some("Nobody".into()),
            ..OperatorFilter::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OperatorNotFound));

    let err = client
        .operators()
        .get(&OperatorFilter {
            first_name: Some("Alex".into()),
            ..OperatorFilter::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousOperator { count: 2 }));
}
