//! Transport trait: the messaging capabilities consumed by the core.

use crate::error::Result;
use crate::identity::ContactId;
use async_trait::async_trait;

/// A contact-import request. `client_id` correlates the request with its result on the transport side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactImport {
    pub phone: String,
    pub client_id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// Handle to a connected messaging transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Import a phone contact; returns the matched users (possibly none).
    /// May create or update a contact record on the transport side.
    async fn import_contact(&self, contact: &ContactImport) -> Result<Vec<ContactId>>;

    /// Send a text message to a user.
    async fn send_direct_message(&self, to: &ContactId, text: &str) -> Result<()>;
}
