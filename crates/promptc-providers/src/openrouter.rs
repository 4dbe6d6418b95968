//! OpenRouter chat completions.

use crate::http;
use crate::instruction::{SYSTEM_INSTRUCTION, optimization_request};
use async_trait::async_trait;
use promptc_core::PromptRequest;
use promptc_runtime::{Provider, ProviderError, ProviderTier};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterProvider {
    name: String,
    model: String,
    url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(
        url: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            name: format!("openrouter ({})", model),
            model: model.to_string(),
            url: url.to_string(),
            api_key,
            timeout,
            client: http::client(timeout)?,
        })
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ProviderTier {
        ProviderTier::Cloud
    }

    async fn transform(
        &self,
        request: &PromptRequest,
        issues: &[String],
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: optimization_request(request, issues),
                },
            ],
        };

        let response: ChatResponse = http::send_json(
            self.client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body),
            self.timeout,
        )
        .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
