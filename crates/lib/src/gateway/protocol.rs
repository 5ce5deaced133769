//! Control-plane request and response bodies.

use crate::identity::ContactId;
use serde::{Deserialize, Deserializer, Serialize};

/// `POST /send` body: `{ phone, firstMessage, prompt }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_message: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// `POST /update-prompt` body: `{ phone?, userId?, newPrompt }`. `userId` may be a string or a number.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromptRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "contact_id_from_string_or_number")]
    pub user_id: Option<ContactId>,
    #[serde(default)]
    pub new_prompt: Option<String>,
}

/// Success body: `{ success: true, userId }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub success: bool,
    pub user_id: ContactId,
}

impl SuccessResponse {
    pub fn new(user_id: ContactId) -> Self {
        Self {
            success: true,
            user_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(i64),
}

fn contact_id_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<ContactId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::String(s) => ContactId::from(s),
            StringOrNumber::Number(n) => ContactId::from(n),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_string_or_number() {
        let a: UpdatePromptRequest =
            serde_json::from_str(r#"{"userId":"123","newPrompt":"x"}"#).unwrap();
        let b: UpdatePromptRequest =
            serde_json::from_str(r#"{"userId":123,"newPrompt":"x"}"#).unwrap();
        assert_eq!(a.user_id, Some(ContactId::new("123")));
        assert_eq!(b.user_id, a.user_id);
    }

    #[test]
    fn absent_fields_default_to_none() {
        let r: UpdatePromptRequest = serde_json::from_str(r#"{"phone":"+1"}"#).unwrap();
        assert!(r.user_id.is_none());
        assert!(r.new_prompt.is_none());
        let s: SendRequest = serde_json::from_str("{}").unwrap();
        assert!(s.phone.is_none() && s.first_message.is_none() && s.prompt.is_none());
    }

    #[test]
    fn success_body_uses_camel_case() {
        let v = serde_json::to_value(SuccessResponse::new(ContactId::new("U1"))).unwrap();
        assert_eq!(v, serde_json::json!({ "success": true, "userId": "U1" }));
    }
}
