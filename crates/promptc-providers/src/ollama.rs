//! Local Ollama node.

use crate::http;
use crate::instruction::completion_prompt;
use async_trait::async_trait;
use promptc_core::PromptRequest;
use promptc_runtime::{Provider, ProviderError, ProviderTier};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OllamaProvider {
    name: String,
    model: String,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// `base_url` is `http://host:port`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            name: format!("ollama ({})", model),
            model: model.to_string(),
            url: format!("{}/api/generate", base_url.trim_end_matches('/')),
            timeout,
            client: http::client(timeout)?,
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ProviderTier {
        ProviderTier::Local
    }

    async fn transform(
        &self,
        request: &PromptRequest,
        issues: &[String],
    ) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: completion_prompt(request, issues),
            stream: false,
        };

        let response: GenerateResponse =
            http::send_json(self.client.post(&self.url).json(&body), self.timeout).await?;

        let text = response.response.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
