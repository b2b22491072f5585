//! The assistant against an in-process HTTP backend.

use std::io::Read;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use campus_assistant::{Assistant, AuthMode, HttpChatBackend, PageContext, Synchronizer};
use campus_config::{ApiConfig, AssistantConfig};
use campus_core::{IdentityRecord, Role};
use campus_identity::{ApiClient, IdentityStore, MemoryStore};

#[derive(Debug)]
struct Seen {
    method: String,
    url: String,
    auth: Option<String>,
    body: String,
}

struct FakeBackend {
    base_url: String,
    handle: JoinHandle<Vec<Seen>>,
}

impl FakeBackend {
    /// Answer one request per entry of `responses`, in order.
    fn serve(responses: Vec<(i32, &'static str)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind fake backend");
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .expect("tcp listener");
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let Ok(mut request) = server.recv() else { break };
                let mut request_body = String::new();
                let _ = request.as_reader().read_to_string(&mut request_body);
                seen.push(Seen {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    auth: request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string()),
                    body: request_body,
                });
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(
                        tiny_http::Header::from_bytes("Content-Type", "application/json")
                            .expect("header"),
                    );
                let _ = request.respond(response);
            }
            seen
        });
        Self {
            base_url: format!("http://127.0.0.1:{port}/api"),
            handle,
        }
    }

    fn requests(self) -> Vec<Seen> {
        self.handle.join().expect("fake backend thread")
    }
}

fn assistant(
    base_url: &str,
    store: &Arc<IdentityStore>,
    page: &str,
) -> Assistant<HttpChatBackend> {
    let api = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
    };
    let client = ApiClient::new(api, Arc::clone(store)).expect("client");
    let sync = Synchronizer::new(Arc::clone(store), &AssistantConfig::default())
        .with_page(PageContext::new(page, ""));
    Assistant::new(sync, HttpChatBackend::new(client), Duration::from_secs(5))
}

#[tokio::test]
async fn guest_credential_rejected_by_backend() {
    let backend = FakeBackend::serve(vec![(401, r#"{"success":false,"message":"Invalid token"}"#)]);
    let store = Arc::new(IdentityStore::new(Arc::new(MemoryStore::new())));
    let assistant = assistant(&backend.base_url, &store, "/faculty/dashboard");

    let view = assistant.open().await;

    assert_eq!(view.mode, AuthMode::Fallback);
    assert!(view.degraded);
    assert!(!store.is_authenticated());

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/api/chatbot/suggestions?context=faculty");
    let auth = requests[0].auth.as_deref().expect("bearer header");
    assert!(auth.starts_with("Bearer guest:faculty:"), "{auth}");
}

#[tokio::test]
async fn logged_in_chat_round_trip() {
    let backend = FakeBackend::serve(vec![
        (
            200,
            r#"{"success":true,"data":{"suggestions":["Check attendance records"],"context":"student","role":"student"}}"#,
        ),
        (
            200,
            r#"{"success":true,"data":{"response":"Your fee payment is due Friday.","isNavigation":false,"navigationType":null}}"#,
        ),
    ]);
    let store = Arc::new(IdentityStore::new(Arc::new(MemoryStore::new())));
    store
        .write(&IdentityRecord::new("t1", Role::Student, "S1"))
        .expect("write");
    let assistant = assistant(&backend.base_url, &store, "/student");

    let view = assistant.open().await;
    assert_eq!(view.mode, AuthMode::Authenticated);
    assert_eq!(view.suggestions, vec!["Check attendance records".to_string()]);

    let reply = assistant.ask("When is my fee due?").await;
    assert_eq!(reply.content, "Your fee payment is due Friday.");
    assert_eq!(reply.suggestions[0], "Pay fees");
    assert!(!reply.reduced_capability);
    assert!(reply.navigation.is_none());

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].url, "/api/chatbot/chat");
    assert_eq!(requests[1].auth.as_deref(), Some("Bearer t1"));
    let body: serde_json::Value = serde_json::from_str(&requests[1].body).expect("json body");
    assert_eq!(
        body,
        serde_json::json!({"message": "When is my fee due?", "context": "student"})
    );
}
