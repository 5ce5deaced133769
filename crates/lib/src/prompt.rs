//! Prompt updates: rewrite a conversation's governing instruction.

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::identity::ContactId;

impl Bridge {
    /// Replace the instruction of an existing conversation.
    ///
    /// The conversation is selected by `user_id` when given, otherwise by resolving `phone`.
    /// Never creates a conversation.
    pub async fn update_prompt(
        &self,
        phone: Option<&str>,
        user_id: Option<&ContactId>,
        new_instruction: &str,
    ) -> Result<ContactId> {
        if new_instruction.trim().is_empty() {
            return Err(Error::Validation("newPrompt is required".to_string()));
        }
        let user_id = user_id.filter(|id| !id.as_str().trim().is_empty());
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());

        let id = match (user_id, phone) {
            (Some(id), _) => id.clone(),
            (None, Some(phone)) => self.resolver.resolve(phone).await?,
            (None, None) => {
                return Err(Error::Validation(
                    "either phone or userId is required".to_string(),
                ))
            }
        };

        if !self.store.contains(&id).await {
            return Err(Error::NotFound(format!("no conversation with user {}", id)));
        }
        self.store.set_instruction(&id, new_instruction).await?;
        log::info!("prompt: instruction updated for user {}", id);
        Ok(id)
    }
}
