//! Chat-completion client. The model endpoint is treated as a black-box
//! text oracle: history in, assistant text out.

use serde::{Deserialize, Serialize};

use crate::error::RoomError;
use crate::types::Message;

#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Send the accumulated history and return the assistant's reply text.
    pub async fn complete(&self, messages: &[Message]) -> Result<String, RoomError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await
            .map_err(|e| RoomError::LlmError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RoomError::LlmError(format!(
                "chat completion returned {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RoomError::LlmError(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RoomError::LlmError("empty choices in completion".into()))
    }
}
