//! Inbound message from the transport: delivered to the router for conversation handling.

use crate::identity::ContactId;

/// One incoming message event. Either part may be missing (media-only messages, unresolvable senders).
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: Option<ContactId>,
    pub text: Option<String>,
}

impl InboundMessage {
    pub fn new(sender: impl Into<ContactId>, text: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            text: Some(text.into()),
        }
    }

    /// Text body, if present and non-empty. Whitespace-only text counts as a body.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}
