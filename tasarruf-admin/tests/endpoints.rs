use serde_json::json;
use std::sync::Arc;

use tasarruf_admin::api::mock::MockTransport;
use tasarruf_admin::api::{ApiClient, ApiError, Method, RetryPolicy};
use tasarruf_admin::session::SessionContext;
use tasarruf_admin::storage::{MemoryStorageAdapter, StorageAdapter};
use tasarruf_types::PlanRequest;

fn client(mock: Arc<MockTransport>, token: Option<&str>) -> ApiClient {
    let storage = MemoryStorageAdapter::new();
    if let Some(token) = token {
        storage.store_credentials(token).unwrap();
    }
    let session = Arc::new(SessionContext::new(Box::new(storage)));
    ApiClient::with_transport("http://api.test", session, mock).with_retry_policy(RetryPolicy::immediate(3))
}

fn plan_json(id: u64) -> serde_json::Value {
    json!({
        "ID": id,
        "englishName": "Silver",
        "trukishName": "Gümüş",
        "price": 60.0,
        "countOfOffers": 5
    })
}

#[tokio::test]
async fn test_create_plan_posts_write_names_once() {
    let mock = Arc::new(MockTransport::new());
    mock.on(Method::Post, "/plans", MockTransport::json(200, json!({ "plan": plan_json(11) })));
    let client = client(mock.clone(), Some("issued-token-123"));
    let request = PlanRequest {
        english_name: "Silver".to_string(),
        turkish_name: "Gümüş".to_string(),
        price: 60.0,
        count_of_offers: 5,
        ..Default::default()
    };

    let plan = client.create_plan(&request).await.unwrap();

    assert_eq!(plan.id, 11);
    assert_eq!(plan.turkish_name, "Gümüş");
    let sent = mock.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(sent[0].url, "http://api.test/plans");
    assert_eq!(sent[0].header("Token"), Some("issued-token-123"));
    let body = sent[0].body.as_ref().unwrap();
    assert_eq!(body["englishName"], "Silver");
    assert_eq!(body["turkishName"], "Gümüş");
    assert_eq!(body["countOfOffers"], 5);
}

#[tokio::test]
async fn test_create_plan_is_not_retried() {
    let mock = Arc::new(MockTransport::new());
    mock.always(Method::Post, "/plans", MockTransport::network_error("timeout"));
    let client = client(mock.clone(), Some("issued-token-123"));

    let err = client.create_plan(&PlanRequest::default()).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(mock.count(Method::Post, "/plans"), 1);
}

#[tokio::test]
async fn test_delete_plan_unwraps_plan_envelope() {
    let mock = Arc::new(MockTransport::new());
    mock.on(Method::Delete, "/plans/11", MockTransport::json(200, json!({ "plan": plan_json(11) })));
    let client = client(mock.clone(), Some("issued-token-123"));

    let deleted = client.delete_plan(11).await.unwrap();

    assert_eq!(deleted.id, 11);
    let sent = mock.requests();
    assert_eq!(sent[0].method, Method::Delete);
    assert_eq!(sent[0].url, "http://api.test/plans/11");
    assert!(sent[0].body.is_none());
}

#[tokio::test]
async fn test_delete_plan_without_envelope_key_is_decoding_error() {
    let mock = Arc::new(MockTransport::new());
    mock.on(Method::Delete, "/plans/11", MockTransport::json(200, json!({ "success": "deleted" })));
    let client = client(mock, Some("issued-token-123"));

    let err = client.delete_plan(11).await.unwrap_err();

    assert!(matches!(err, ApiError::Decoding(ref msg) if msg.contains("plan")), "{:?}", err);
}

#[tokio::test]
async fn test_get_city_reads_city_key() {
    let mock = Arc::new(MockTransport::new());
    mock.on(
        Method::Get,
        "/city/4",
        MockTransport::json(200, json!({ "city": { "ID": 4, "englishName": "Izmir", "turkishName": "İzmir" } })),
    );
    let client = client(mock.clone(), Some("issued-token-123"));

    let city = client.get_city(4).await.unwrap();

    assert_eq!(city.id, 4);
    assert_eq!(city.turkish_name, "İzmir");
    let sent = mock.requests();
    assert_eq!(sent[0].method, Method::Get);
    assert_eq!(sent[0].url, "http://api.test/city/4");
    assert_eq!(sent[0].header("Token"), Some("issued-token-123"));
}

#[tokio::test]
async fn test_public_reads_work_logged_out() {
    let mock = Arc::new(MockTransport::new());
    mock.on(Method::Get, "/public/cities", MockTransport::json(200, json!({ "cities": [] })));
    mock.on(
        Method::Get,
        "/public/support-info",
        MockTransport::json(200, json!({ "info": { "email": "help@tasarruf.app", "mobile": "+90 555" } })),
    );
    let client = client(mock.clone(), None);

    assert!(client.get_cities().await.unwrap().is_empty());
    assert_eq!(client.get_support_info().await.unwrap().email, "help@tasarruf.app");
    assert!(mock.requests().iter().all(|r| r.header("Token").is_none()));
}
