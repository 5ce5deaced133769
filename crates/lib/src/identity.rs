//! Contact identity: the opaque conversation key and the phone-number resolver.
//!
//! The transport hands out numeric user ids; they are normalized to a
//! `ContactId` at the boundary so nothing past it depends on the native type.

use crate::channels::{ContactImport, Transport};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Stable key for a remote conversation partner (decimal string of the transport user id).
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for ContactId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ContactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContactId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves a phone number to a `ContactId` through the transport's contact import.
pub struct IdentityResolver {
    transport: Arc<dyn Transport>,
    first_name: String,
    last_name: String,
    last_token: AtomicI64,
}

impl IdentityResolver {
    /// `first_name` / `last_name` are the placeholder names given to imported contacts.
    pub fn new(
        transport: Arc<dyn Transport>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            first_name: first_name.into(),
            last_name: last_name.into(),
            last_token: AtomicI64::new(0),
        }
    }

    /// Current time in ms, strictly increasing across calls in this process.
    fn next_client_id(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last_token.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self
                .last_token
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Import the phone number as a contact and return the first matched user.
    pub async fn resolve(&self, phone: &str) -> Result<ContactId> {
        let import = ContactImport {
            phone: phone.trim().to_string(),
            client_id: self.next_client_id(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        };
        let users = self.transport.import_contact(&import).await?;
        log::debug!("identity: import of {} matched {} user(s)", import.phone, users.len());
        users
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound("user not found after import".to_string()))
    }
}
