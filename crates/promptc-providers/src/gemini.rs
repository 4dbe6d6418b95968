//! Google Gemini via the `generateContent` REST endpoint.

use crate::http;
use crate::instruction::{SYSTEM_INSTRUCTION, optimization_request};
use async_trait::async_trait;
use promptc_core::PromptRequest;
use promptc_runtime::{Provider, ProviderError, ProviderTier};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

pub struct GeminiProvider {
    name: String,
    url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// `endpoint` is the API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            name: format!("gemini ({})", model),
            url: format!(
                "{}/models/{}:generateContent",
                endpoint.trim_end_matches('/'),
                model
            ),
            api_key,
            timeout,
            client: http::client(timeout)?,
        })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
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
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": optimization_request(request, issues) }]
            }],
            "generationConfig": { "temperature": 0.2 }
        });

        let response: GenerateContentResponse = http::send_json(
            self.client
                .post(&self.url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body),
            self.timeout,
        )
        .await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
