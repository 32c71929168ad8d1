use serde_json::json;
use std::sync::Arc;

use tasarruf_admin::api::mock::MockTransport;
use tasarruf_admin::api::{ApiClient, Method, MutationError, RetryPolicy};
use tasarruf_admin::associations::{AssociationEditor, EditorState};
use tasarruf_admin::notify::{LoadingFlag, Snackbar};
use tasarruf_admin::session::SessionContext;
use tasarruf_admin::storage::{MemoryStorageAdapter, StorageAdapter};
use tasarruf_types::{Category, Id, PlanRequest};

const PLAN: Id = 7;
const A: Id = 1;
const B: Id = 2;
const C: Id = 3;

fn category_json(id: Id, name: &str) -> serde_json::Value {
    json!({ "ID": id, "englishName": name, "turkishName": name })
}

fn catalog_json() -> serde_json::Value {
    json!({ "categories": [category_json(A, "Cafes"), category_json(B, "Bakeries"), category_json(C, "Cinemas")] })
}

fn association_path(category_id: Id) -> String {
    format!("/admin/associate-plan-category?planID={}&categoryID={}", PLAN, category_id)
}

/// Backend with catalog {A, B, C} and plan 7 linked to {A}
fn backend() -> Arc<MockTransport> {
    let mock = Arc::new(MockTransport::new());
    mock.always(
        Method::Get,
        "/admin/categories?planID=7",
        MockTransport::json(200, json!({ "categories": [category_json(A, "Cafes")] })),
    );
    mock.always(Method::Get, "/category", MockTransport::json(200, catalog_json()));
    mock.always(
        Method::Put,
        "/plans/7",
        MockTransport::json(
            200,
            json!({ "plan": { "ID": 7, "englishName": "Gold", "trukishName": "Altın", "price": 120.0, "countOfOffers": 12 } }),
        ),
    );
    mock
}

fn client(mock: Arc<MockTransport>) -> ApiClient {
    let storage = MemoryStorageAdapter::new();
    storage.store_credentials("issued-token-123").unwrap();
    let session = Arc::new(SessionContext::new(Box::new(storage)));
    ApiClient::with_transport("http://api.test", session, mock).with_retry_policy(RetryPolicy::immediate(3))
}

fn ids(categories: &[Category]) -> Vec<Id> {
    let mut ids: Vec<Id> = categories.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    ids
}

fn plan_update() -> PlanRequest {
    PlanRequest {
        english_name: "Gold".to_string(),
        turkish_name: "Altın".to_string(),
        price: 120.0,
        count_of_offers: 12,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_add_then_failed_add_then_bulk_update() {
    let mock = backend();
    mock.always(Method::Post, &association_path(B), MockTransport::json(200, json!({ "success": "associated" })));
    mock.always(Method::Post, &association_path(C), MockTransport::network_error("connection reset"));
    let snackbar = Snackbar::new();
    let loading = LoadingFlag::new();
    let mut editor = AssociationEditor::for_client(&client(mock.clone()), PLAN, snackbar.clone(), loading.clone());

    editor.load().await.unwrap();
    assert!(editor.is_ready());
    assert_eq!(ids(editor.available()), vec![B, C]);

    editor.add(B).await.unwrap();
    assert_eq!(ids(editor.current()), vec![A, B]);
    assert_eq!(ids(editor.available()), vec![C]);
    snackbar.drain();

    let err = editor.add(C).await.unwrap_err();
    assert!(matches!(err, MutationError::Transport(_)));
    assert_eq!(ids(editor.current()), vec![A, B]);
    assert_eq!(ids(editor.available()), vec![C]);
    let errors: Vec<_> = snackbar.drain().into_iter().filter(|n| n.is_error).collect();
    assert_eq!(errors.len(), 1);
    // Association adds are safe to retry
    assert_eq!(mock.count(Method::Post, "/admin/associate-plan-category"), 1 + 3);

    let outcome = editor.bulk_add_then_update_plan(&[C], &plan_update()).await;

    assert_eq!(outcome.failed.len(), 1);
    assert!(outcome.associated.is_empty());
    assert_eq!(outcome.plan.unwrap().price, 120.0);
    assert_eq!(mock.count(Method::Put, "/plans/7"), 1);
    assert!(snackbar.messages().contains(&"Plan edited successfully".to_string()));
    assert_eq!(editor.state(), &EditorState::Ready);
    assert!(!loading.is_loading());
}

#[tokio::test]
async fn test_requests_carry_token_and_write_names() {
    let mock = backend();
    mock.always(Method::Post, &association_path(B), MockTransport::json(200, json!({ "success": "associated" })));
    let mut editor = AssociationEditor::for_client(&client(mock.clone()), PLAN, Snackbar::new(), LoadingFlag::new());
    editor.load().await.unwrap();

    editor.bulk_add_then_update_plan(&[B], &plan_update()).await;

    let requests = mock.requests();
    assert!(requests.iter().all(|r| r.header("Token") == Some("issued-token-123")));
    let put = requests.iter().find(|r| r.method == Method::Put).unwrap();
    let body = put.body.as_ref().unwrap();
    assert_eq!(body["turkishName"], "Altın");
    assert!(body.get("trukishName").is_none());
}

#[tokio::test]
async fn test_remove_refetches_catalog() {
    let mock = backend();
    mock.on(
        Method::Delete,
        &association_path(A),
        MockTransport::json(200, json!({ "success": "removed" })),
    );
    let snackbar = Snackbar::new();
    let mut editor = AssociationEditor::for_client(&client(mock.clone()), PLAN, snackbar.clone(), LoadingFlag::new());
    editor.load().await.unwrap();

    editor.remove(A).await.unwrap();

    assert!(editor.current().is_empty());
    assert_eq!(ids(editor.available()), vec![A, B, C]);
    assert_eq!(mock.count(Method::Get, "/category"), 2);
    assert_eq!(snackbar.messages(), vec!["Association removed successfully"]);
}

#[tokio::test]
async fn test_failed_catalog_refresh_after_remove_is_reported() {
    let mock = backend();
    mock.on(Method::Get, "/category", MockTransport::json(200, catalog_json()));
    mock.on(Method::Get, "/category", MockTransport::json(500, json!({ "error": "db", "message": "database down" })));
    mock.on(Method::Delete, &association_path(A), MockTransport::json(200, json!({ "success": "removed" })));
    let snackbar = Snackbar::new();
    let mut editor = AssociationEditor::for_client(&client(mock.clone()), PLAN, snackbar.clone(), LoadingFlag::new());
    editor.load().await.unwrap();

    editor.remove(A).await.unwrap();

    assert!(editor.current().is_empty());
    assert_eq!(ids(editor.available()), vec![A, B, C]);
    let notices = snackbar.drain();
    assert_eq!(notices[0].message, "Association removed successfully");
    let errors: Vec<_> = notices.iter().filter(|n| n.is_error).map(|n| n.message.as_str()).collect();
    assert_eq!(errors, vec!["error getting categories, please try again"]);
}

#[tokio::test]
async fn test_failed_load_is_recoverable() {
    let mock = Arc::new(MockTransport::new());
    mock.on(Method::Get, "/category", MockTransport::json(500, json!({ "error": "db", "message": "database down" })));
    mock.always(Method::Get, "/category", MockTransport::json(200, catalog_json()));
    mock.always(
        Method::Get,
        "/admin/categories?planID=7",
        MockTransport::json(200, json!({ "categories": null })),
    );
    let mut editor = AssociationEditor::for_client(&client(mock), PLAN, Snackbar::new(), LoadingFlag::new());

    assert!(editor.load().await.is_err());
    assert!(matches!(editor.state(), EditorState::Error(_)));
    assert!(!editor.is_ready());

    editor.load().await.unwrap();
    assert!(editor.is_ready());
    assert!(editor.current().is_empty());
    assert_eq!(ids(editor.available()), vec![A, B, C]);
}
