//! OpenAI-compatible chat completions client (POST {base}/chat/completions, non-streaming).

use crate::conversation::{Message, Role};
use crate::error::{Error, Result};
use crate::llm::CompletionBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<Message> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
        };
        log::debug!("completion: POST {} model={} messages={}", url, self.model, messages.len());
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Completion(format!("{} {}", status, body)));
        }
        let data: ChatCompletionResponse = res.json().await?;
        reply_from_response(data)
    }
}

/// First choice's message as an assistant reply. Missing choices or empty content is an error.
fn reply_from_response(data: ChatCompletionResponse) -> Result<Message> {
    let message = data
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .ok_or_else(|| Error::Completion("response contained no choices".to_string()))?;
    match message.content {
        Some(content) if !content.trim().is_empty() => Ok(Message {
            role: Role::Assistant,
            content,
        }),
        _ => Err(Error::Completion(
            "response contained no message content".to_string(),
        )),
    }
}

// --- wire types ---

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
