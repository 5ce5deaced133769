//! Shared context for the conversation operations (outreach, prompt updates, inbound routing).

use crate::channels::Transport;
use crate::conversation::ConversationStore;
use crate::identity::IdentityResolver;
use crate::llm::CompletionBackend;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Store, resolver, transport and completion backend, cheap to clone into tasks and handlers.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) store: Arc<ConversationStore>,
    pub(crate) resolver: Arc<IdentityResolver>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) completion: Arc<dyn CompletionBackend>,
    pub(crate) completion_timeout: Duration,
}

impl Bridge {
    /// New bridge with an empty store, "Temp User" placeholder contacts and a 60s completion timeout.
    pub fn new(transport: Arc<dyn Transport>, completion: Arc<dyn CompletionBackend>) -> Self {
        Self {
            store: Arc::new(ConversationStore::new()),
            resolver: Arc::new(IdentityResolver::new(transport.clone(), "Temp", "User")),
            transport,
            completion,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }

    /// Placeholder names used when importing a phone number as a contact.
    pub fn with_contact_names(mut self, first_name: &str, last_name: &str) -> Self {
        self.resolver = Arc::new(IdentityResolver::new(
            self.transport.clone(),
            first_name,
            last_name,
        ));
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }
}
