use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use docsum::{
    api::create_router,
    auth::{generate_token, hash_token},
    processing::{DocumentService, ERROR_SUMMARY, INVALID_CHOICE, NO_VALID_SUMMARY},
    store::DocumentStore,
    summarization::OllamaChatClient,
};
use httpmock::{Method::POST, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "docsum-integration";

struct Harness {
    _dir: tempfile::TempDir,
    app: Router,
    alice: String,
    bob: String,
}

impl Harness {
    async fn new(server: &MockServer) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::open(&dir.path().join("docsum.sqlite"), dir.path().join("media"))
            .await
            .expect("store");

        let alice = generate_token();
        let bob = generate_token();
        store
            .create_user("alice", &hash_token(&alice))
            .await
            .expect("alice");
        store.create_user("bob", &hash_token(&bob)).await.expect("bob");

        let client = OllamaChatClient::new(server.base_url(), None).expect("client");
        let service = DocumentService::new(store, Box::new(client), "deepseek-r1");
        let app = create_router(Arc::new(service), 1024 * 1024);

        Self {
            _dir: dir,
            app,
            alice,
            bob,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn upload(&self, token: &str, name: &str, files: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"set_name\"\r\n\r\n{name}\r\n"
        );
        for (filename, content) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"documents\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/sets")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    async fn summarize(&self, token: &str, selection: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/summary")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "document_set": selection }).to_string()))
            .expect("request");
        self.send(request).await
    }

    async fn list(&self, token: &str) -> Value {
        let request = Request::builder()
            .uri("/sets")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request");
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn metrics(&self) -> Value {
        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .expect("request");
        self.send(request).await.1
    }
}

fn chat_reply(content: &str) -> Value {
    json!({
        "model": "deepseek-r1",
        "message": { "role": "assistant", "content": content },
        "done": true
    })
}

#[tokio::test]
async fn upload_then_summarize_renders_filtered_lines() {
    let server = MockServer::start_async().await;
    let harness = Harness::new(&server).await;

    let chat = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_contains("Attention.pdf")
                .body_contains("Transformers.pdf");
            then.status(200).json_body(chat_reply(
                "<think>planning</think>Here is the summary:\n\
                 **Attention.pdf**: Covers **self-attention** <layers>.\n\
                 **Transformers.pdf**: Architecture overview.\n\
                 Thanks!",
            ));
        })
        .await;

    let (status, uploaded) = harness
        .upload(
            &harness.alice,
            "Papers",
            &[("Attention.pdf", "%PDF-1"), ("Transformers.pdf", "%PDF-2")],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["document_set"]["name"], "Papers");
    assert_eq!(uploaded["document_set"]["document_count"], 2);
    assert_eq!(uploaded["messages"][0]["text"], "Documents uploaded successfully.");

    let listed = harness.list(&harness.alice).await;
    let set_id = uploaded["document_set"]["id"].clone();
    assert_eq!(listed["document_sets"][0]["id"], set_id);

    let (status, summary) = harness.summarize(&harness.alice, set_id).await;
    assert_eq!(status, StatusCode::OK);
    chat.assert_async().await;

    let html = summary["summary"].as_str().expect("summary string");
    assert!(html.starts_with("<p><strong>Attention.pdf</strong>:"));
    assert!(html.contains("<strong>self-attention</strong>"));
    assert!(html.contains("&lt;layers&gt;"));
    assert!(html.contains("<strong>Transformers.pdf</strong>: Architecture overview."));
    assert!(!html.contains("planning"));
    assert!(!html.contains("Thanks!"));
    assert_eq!(html.matches("<p>").count(), 2);
    assert_eq!(summary["messages"], json!([]));

    let metrics = harness.metrics().await;
    assert_eq!(metrics["sets_created"], 1);
    assert_eq!(metrics["documents_uploaded"], 2);
    assert_eq!(metrics["summaries_generated"], 1);
}

#[tokio::test]
async fn other_users_cannot_summarize_or_list_a_set() {
    let server = MockServer::start_async().await;
    let harness = Harness::new(&server).await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(chat_reply("**secret.pdf**: leaked"));
        })
        .await;

    let (_, uploaded) = harness
        .upload(&harness.alice, "Private", &[("secret.pdf", "x")])
        .await;
    let set_id = uploaded["document_set"]["id"].clone();

    let (status, body) = harness.summarize(&harness.bob, set_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["document_set"][0], INVALID_CHOICE);

    let (status, unknown) = harness.summarize(&harness.bob, json!(9999)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown["errors"], body["errors"]);

    assert_eq!(harness.list(&harness.bob).await["document_sets"], json!([]));
    assert_eq!(chat.hits_async().await, 0);
}

#[tokio::test]
async fn model_failure_returns_error_summary_with_notice() {
    let server = MockServer::start_async().await;
    let harness = Harness::new(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(500).body("model not loaded");
        })
        .await;

    let (_, uploaded) = harness
        .upload(&harness.alice, "Papers", &[("A.pdf", "a")])
        .await;
    let (status, body) = harness
        .summarize(&harness.alice, uploaded["document_set"]["id"].clone())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], ERROR_SUMMARY);
    assert_eq!(body["messages"][0]["level"], "error");
    assert!(
        body["messages"][0]["text"]
            .as_str()
            .is_some_and(|text| text.contains("model not loaded"))
    );
    assert_eq!(harness.metrics().await["summaries_failed"], 1);
}

#[tokio::test]
async fn reply_without_matching_lines_yields_fallback() {
    let server = MockServer::start_async().await;
    let harness = Harness::new(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200)
                .json_body(chat_reply("These documents are about many things."));
        })
        .await;

    let (_, uploaded) = harness
        .upload(&harness.alice, "Papers", &[("A.pdf", "a")])
        .await;
    let (status, body) = harness
        .summarize(&harness.alice, uploaded["document_set"]["id"].clone())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], NO_VALID_SUMMARY);
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn rejected_upload_writes_nothing() {
    let server = MockServer::start_async().await;
    let harness = Harness::new(&server).await;

    let (status, body) = harness.upload(&harness.alice, "  ", &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["set_name"][0], "This field is required.");
    assert_eq!(body["errors"]["documents"][0], "This field is required.");
    assert_eq!(body["messages"][0]["level"], "error");
    assert_eq!(harness.list(&harness.alice).await["document_sets"], json!([]));
}
