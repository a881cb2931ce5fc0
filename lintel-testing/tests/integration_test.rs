//! Fixtures driving a real resource binding.

use lintel_core::{
    CacheControl, CachingConfig, PersistenceError, Resource, ResourceBinding, ResourceSettings,
    RoleRequirement, RouterRegistry,
};
use lintel_testing::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    #[serde(default)]
    id: String,
    text: String,
}

struct Notes;

impl Resource for Notes {
    type Model = Note;
    type View = Note;

    fn name(&self) -> &str {
        "notes"
    }

    fn configure(&self, settings: &mut ResourceSettings) {
        settings.caching = CachingConfig::validate_by_etag(CacheControl::new().private());
        settings.roles = RoleRequirement::any(["writer", "admin"]);
    }

    fn model_id(&self, model: &Note) -> String {
        model.id.clone()
    }
}

fn note(id: &str, text: &str) -> Note {
    Note {
        id: id.to_string(),
        text: text.to_string(),
    }
}

fn fixture() -> (TestClient, Arc<InMemoryRepository<Note>>) {
    let repo = Arc::new(
        InMemoryRepository::new(|n: &Note| n.id.clone())
            .with_ids(IdStrategy::Sequential, |n, id| n.id = id)
            .with_rows([note("1", "first"), note("2", "second")]),
    );
    let auth = StaticAuthProvider::new()
        .with_user("w", "wendy", &["writer"])
        .with_user("r", "rick", &["reader"]);

    let binding = ResourceBinding::new(Notes, Arc::clone(&repo) as _)
        .with_auth_provider(Arc::new(auth));
    let mut registry = RouterRegistry::new();
    assert!(registry.bind("/notes", &binding, "id", None).is_empty());
    (TestClient::new(registry.into_router()), repo)
}

#[tokio::test]
async fn test_create_then_read() {
    let (client, repo) = fixture();

    let created = client
        .send(
            TestRequest::post("/notes")
                .bearer("w")
                .json(&serde_json::json!({"text": "third"}))
                .unwrap(),
        )
        .await;
    assert_status(&created, 201);
    assert_header(&created, "Location", "/notes/3");
    assert_empty_body(&created);
    assert_eq!(repo.get("3"), Some(note("3", "third")));

    let read = client.send(TestRequest::get("/notes/3").bearer("w")).await;
    assert_status(&read, 200);
    assert_json(&read, &note("3", "third"));
    assert_header(&read, "Cache-Control", "private");
    assert_link(&read, "self", "/notes/3");
}

#[tokio::test]
async fn test_roles_enforced() {
    let (client, repo) = fixture();

    assert_error_body(&client.get("/notes/1").await, 401);
    assert_error_body(&client.send(TestRequest::get("/notes/1").bearer("r")).await, 403);
    assert_error_body(&client.send(TestRequest::get("/notes/1").bearer("zzz")).await, 401);
    assert!(!repo.was_called(RepoOp::Load));
}

#[tokio::test]
async fn test_collection_paging() {
    let (client, _) = fixture();
    let response = client
        .send(TestRequest::get("/notes").page(0, 1).bearer("w"))
        .await;

    assert_status(&response, 200);
    assert_header(&response, "X-totalnumberofresults", "2");
    assert_header(&response, "X-numberofresults", "1");
    assert_link(&response, "self", "/notes?offset=0&size=1");
    assert_link(&response, "next", "/notes?offset=1&size=1");
    assert_no_link(&response, "prev");
    assert_no_link(&response, "last");
}

#[tokio::test]
async fn test_storage_failure_is_generic_500() {
    let (client, repo) = fixture();
    repo.fail_on(RepoOp::Load, PersistenceError::Storage("db at 10.0.0.7 down".into()));

    let response = client.send(TestRequest::get("/notes/1").bearer("w")).await;
    let body = assert_error_body(&response, 500);
    assert!(!body.message.contains("10.0.0.7"));
}

#[tokio::test]
async fn test_conditional_delete() {
    let (client, repo) = fixture();
    let read = client.send(TestRequest::get("/notes/2").bearer("w")).await;
    let etag = read.header("ETag").unwrap().to_string();

    let stale = client
        .send(TestRequest::delete("/notes/2").bearer("w").if_match("\"old\""))
        .await;
    assert_error_body(&stale, 412);
    assert!(!repo.was_called(RepoOp::Delete));

    let current = client
        .send(TestRequest::delete("/notes/2").bearer("w").if_match(&etag))
        .await;
    assert_status(&current, 204);
    assert_eq!(repo.call_count(RepoOp::Delete), 1);
    assert_eq!(repo.get("2"), None);
}

#[tokio::test]
async fn test_not_modified_has_no_links() {
    let (client, _) = fixture();
    let read = client.send(TestRequest::get("/notes/1").bearer("w")).await;
    let etag = read.header("ETag").unwrap().to_string();

    let again = client
        .send(TestRequest::get("/notes/1").bearer("w").if_none_match(&etag))
        .await;
    assert_status(&again, 304);
    assert_empty_body(&again);
    assert_no_links(&again);
}
