//! In-crate fakes for the transport and completion backend.

use crate::channels::{ContactImport, Transport};
use crate::conversation::Message;
use crate::error::{Error, Result};
use crate::identity::ContactId;
use crate::llm::CompletionBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Transport with a fixed phone directory that records imports and sends.
#[derive(Default)]
pub(crate) struct FakeTransport {
    directory: Mutex<HashMap<String, Vec<ContactId>>>,
    imports: Mutex<Vec<ContactImport>>,
    sent: Mutex<Vec<(ContactId, String)>>,
    fail_imports: AtomicBool,
    fail_sends: AtomicBool,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn register(&self, phone: &str, users: &[&str]) {
        self.directory.lock().await.insert(
            phone.to_string(),
            users.iter().map(|u| ContactId::new(*u)).collect(),
        );
    }

    pub(crate) fn fail_imports(&self, fail: bool) {
        self.fail_imports.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn imports(&self) -> Vec<ContactImport> {
        self.imports.lock().await.clone()
    }

    pub(crate) async fn sent(&self) -> Vec<(ContactId, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn import_contact(&self, contact: &ContactImport) -> Result<Vec<ContactId>> {
        self.imports.lock().await.push(contact.clone());
        if self.fail_imports.load(Ordering::SeqCst) {
            return Err(Error::Transport("import failed".to_string()));
        }
        Ok(self
            .directory
            .lock()
            .await
            .get(&contact.phone)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_direct_message(&self, to: &ContactId, text: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Transport("send failed".to_string()));
        }
        self.sent.lock().await.push((to.clone(), text.to_string()));
        Ok(())
    }
}

/// Completion backend that answers "re: <last message>" after an optional delay.
#[derive(Default)]
pub(crate) struct FakeCompletion {
    calls: Mutex<Vec<Vec<Message>>>,
    delay: Duration,
    fail: AtomicBool,
}

impl FakeCompletion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub(crate) fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CompletionBackend for FakeCompletion {
    async fn complete(&self, messages: &[Message]) -> Result<Message> {
        self.calls.lock().await.push(messages.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Completion("backend unavailable".to_string()));
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(Message::assistant(format!("re: {}", last)))
    }
}
