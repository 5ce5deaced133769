//! Conversation store: per-contact message history with a leading instruction.
//!
//! Conversations are keyed by `ContactId` and hold an ordered list of messages
//! (system/assistant/user). Each conversation sits behind its own mutex so
//! mutations on one contact never wait on another.

use crate::error::{Error, Result};
use crate::identity::ContactId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Who a message is attributed to. Serialized the way the completion API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The conversation-wide instruction (system prompt).
    System,
    Assistant,
    User,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A conversation: contact id and ordered message history.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: ContactId,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Replace the instruction at index 0, or insert one there if the history has none.
    fn set_instruction(&mut self, text: String) {
        match self.messages.first_mut() {
            Some(first) if first.role == Role::System => first.content = text,
            _ => self.messages.insert(0, Message::system(text)),
        }
    }
}

type Slot = Arc<Mutex<Conversation>>;

/// One inbound exchange in progress.
///
/// The reply lands in the conversation the user message was appended to. If that
/// conversation is replaced in the store meanwhile, the reply goes to the old one.
pub(crate) struct Turn {
    slot: Slot,
    pub(crate) history: Vec<Message>,
}

impl Turn {
    pub(crate) async fn record_reply(&self, text: impl Into<String>) {
        self.slot.lock().await.messages.push(Message::assistant(text));
    }
}

/// In-memory store for conversations (create, get, append, set instruction).
pub struct ConversationStore {
    inner: RwLock<HashMap<ContactId, Slot>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    async fn slot(&self, id: &ContactId) -> Option<Slot> {
        self.inner.read().await.get(id).cloned()
    }

    async fn slot_or_not_found(&self, id: &ContactId) -> Result<Slot> {
        self.slot(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("no conversation for user {}", id)))
    }

    /// Start a conversation as `[system(instruction), assistant(seed)]`. Replaces any existing one.
    pub async fn create(
        &self,
        id: ContactId,
        instruction: impl Into<String>,
        seed_assistant: impl Into<String>,
    ) {
        let conversation = Conversation {
            id: id.clone(),
            messages: vec![
                Message::system(instruction),
                Message::assistant(seed_assistant),
            ],
        };
        let replaced = self
            .inner
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(conversation)));
        if replaced.is_some() {
            log::info!("conversation: replaced existing history for user {}", id);
        }
    }

    /// Return a snapshot of the conversation if it exists.
    pub async fn get(&self, id: &ContactId) -> Option<Conversation> {
        let slot = self.slot(id).await?;
        let conversation = slot.lock().await;
        Some(conversation.clone())
    }

    pub async fn contains(&self, id: &ContactId) -> bool {
        self.inner.read().await.contains_key(id)
    }

    /// Number of conversations held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn append_user(&self, id: &ContactId, text: impl Into<String>) -> Result<()> {
        self.append(id, Message::user(text)).await
    }

    pub async fn append_assistant(&self, id: &ContactId, text: impl Into<String>) -> Result<()> {
        self.append(id, Message::assistant(text)).await
    }

    async fn append(&self, id: &ContactId, message: Message) -> Result<()> {
        let slot = self.slot_or_not_found(id).await?;
        slot.lock().await.messages.push(message);
        Ok(())
    }

    /// Append a user message and return the turn: the full history including it, bound to
    /// this conversation instance.
    pub(crate) async fn begin_turn(&self, id: &ContactId, text: impl Into<String>) -> Result<Turn> {
        let slot = self.slot_or_not_found(id).await?;
        let history = {
            let mut conversation = slot.lock().await;
            conversation.messages.push(Message::user(text));
            conversation.messages.clone()
        };
        Ok(Turn { slot, history })
    }

    /// Rewrite the leading instruction. Fails only when the conversation does not exist.
    pub async fn set_instruction(&self, id: &ContactId, text: impl Into<String>) -> Result<()> {
        let slot = self.slot_or_not_found(id).await?;
        slot.lock().await.set_instruction(text.into());
        Ok(())
    }
}
