//! Integration test: serve the control plane on a free port with in-memory
//! transport and completion backends, drive it over HTTP with reqwest.
//! Does not require Telegram or a completion API.

use async_trait::async_trait;
use courier::channels::{ContactImport, InboundMessage, Transport};
use courier::conversation::Message;
use courier::identity::ContactId;
use courier::llm::CompletionBackend;
use courier::router::InboundOutcome;
use courier::{gateway, Bridge, Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MemoryTransport {
    directory: HashMap<String, String>,
    sent: Mutex<Vec<(String, String)>>,
    imports: Mutex<Vec<String>>,
}

impl MemoryTransport {
    fn with_users(users: &[(&str, &str)]) -> Self {
        Self {
            directory: users
                .iter()
                .map(|(phone, id)| (phone.to_string(), id.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn import_count(&self) -> usize {
        self.imports.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn import_contact(&self, contact: &ContactImport) -> Result<Vec<ContactId>> {
        self.imports.lock().unwrap().push(contact.phone.clone());
        Ok(self
            .directory
            .get(&contact.phone)
            .map(|id| vec![ContactId::new(id.as_str())])
            .unwrap_or_default())
    }

    async fn send_direct_message(&self, to: &ContactId, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        Ok(())
    }
}

/// Replies with the instruction and the last message so tests can see what the model saw.
struct EchoCompletion;

#[async_trait]
impl CompletionBackend for EchoCompletion {
    async fn complete(&self, messages: &[Message]) -> Result<Message> {
        let instruction = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let last = messages
            .last()
            .map(|m| m.content.as_str())
            .ok_or_else(|| Error::Completion("empty history".to_string()))?;
        Ok(Message::assistant(format!("[{}] {}", instruction, last)))
    }
}

struct TestServer {
    base: String,
    bridge: Bridge,
    transport: Arc<MemoryTransport>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let transport = Arc::new(MemoryTransport::with_users(&[
            ("+123", "U1"),
            ("+456", "U2"),
        ]));
        let bridge = Bridge::new(transport.clone(), Arc::new(EchoCompletion));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind free port");
        let port = listener.local_addr().expect("local_addr").port();
        let app = gateway::app(bridge.clone(), port);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            bridge,
            transport,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = resp.status().as_u16();
        let json = resp.json().await.expect("json body");
        (status, json)
    }

    async fn history(&self, id: &str) -> Vec<Message> {
        self.bridge
            .store()
            .get(&ContactId::new(id))
            .await
            .map(|c| c.messages)
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn health_reports_running_and_port() {
    let server = TestServer::start().await;
    let json: Value = server
        .client
        .get(format!("{}/", server.base))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(json["runtime"], "running");
    assert_eq!(json["conversations"], 0);
    assert!(json["port"].as_u64().is_some());
}

#[tokio::test]
async fn send_starts_conversation_and_delivers_first_message() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/send",
            json!({ "phone": "+123", "firstMessage": "Hi there", "prompt": "Be friendly" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true, "userId": "U1" }));
    assert_eq!(
        server.transport.sent(),
        vec![("U1".to_string(), "Hi there".to_string())]
    );
    assert_eq!(
        server.history("U1").await,
        vec![Message::system("Be friendly"), Message::assistant("Hi there")]
    );
}

#[tokio::test]
async fn send_with_missing_field_is_400_without_side_effects() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post("/send", json!({ "phone": "+123", "firstMessage": "Hi" }))
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().is_some());
    assert_eq!(server.transport.import_count(), 0);
    assert!(server.transport.sent().is_empty());
}

#[tokio::test]
async fn send_to_unknown_phone_is_404() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/send",
            json!({ "phone": "+999", "firstMessage": "Hi", "prompt": "p" }),
        )
        .await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().is_some());
    assert!(server.transport.sent().is_empty());
    assert!(server.bridge.store().is_empty().await);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let server = TestServer::start().await;
    let resp = server
        .client
        .post(format!("{}/send", server.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn update_prompt_by_user_id_changes_next_reply() {
    let server = TestServer::start().await;
    server
        .post(
            "/send",
            json!({ "phone": "+123", "firstMessage": "Hi there", "prompt": "Be friendly" }),
        )
        .await;

    let (status, body) = server
        .post("/update-prompt", json!({ "userId": "U1", "newPrompt": "Be terse" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true, "userId": "U1" }));

    let outcome = server
        .bridge
        .handle_inbound(InboundMessage::new("U1", "Hello"))
        .await
        .expect("inbound handled");
    assert_eq!(
        outcome,
        InboundOutcome::Replied {
            contact: ContactId::new("U1"),
            reply: "[Be terse] Hello".to_string()
        }
    );
    assert_eq!(
        server.history("U1").await,
        vec![
            Message::system("Be terse"),
            Message::assistant("Hi there"),
            Message::user("Hello"),
            Message::assistant("[Be terse] Hello"),
        ]
    );
}

#[tokio::test]
async fn update_prompt_accepts_numeric_user_id_and_phone() {
    let server = TestServer::start().await;
    server
        .post(
            "/send",
            json!({ "phone": "+456", "firstMessage": "Hey", "prompt": "p1" }),
        )
        .await;

    let (status, body) = server
        .post("/update-prompt", json!({ "phone": "+456", "newPrompt": "p2" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["userId"], "U2");
    assert_eq!(server.history("U2").await[0], Message::system("p2"));

    let (status, _) = server
        .post("/update-prompt", json!({ "userId": 42, "newPrompt": "p3" }))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn update_prompt_errors() {
    let server = TestServer::start().await;

    let (status, _) = server
        .post("/update-prompt", json!({ "userId": "UNKNOWN", "newPrompt": "x" }))
        .await;
    assert_eq!(status, 404);
    assert!(server.bridge.store().is_empty().await);

    let (status, _) = server
        .post("/update-prompt", json!({ "newPrompt": "x" }))
        .await;
    assert_eq!(status, 400);

    let (status, _) = server
        .post("/update-prompt", json!({ "userId": "U1" }))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn inbound_from_stranger_is_ignored() {
    let server = TestServer::start().await;
    server
        .post(
            "/send",
            json!({ "phone": "+123", "firstMessage": "Hi there", "prompt": "Be friendly" }),
        )
        .await;
    let sent_before = server.transport.sent().len();

    let outcome = server
        .bridge
        .handle_inbound(InboundMessage::new("U9", "Who is this?"))
        .await
        .expect("inbound handled");
    assert!(matches!(outcome, InboundOutcome::Ignored(_)));
    assert_eq!(server.transport.sent().len(), sent_before);
    assert!(server.history("U9").await.is_empty());
    assert_eq!(server.history("U1").await.len(), 2);
}
