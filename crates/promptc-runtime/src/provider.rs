use crate::error::ProviderError;
use async_trait::async_trait;
use promptc_core::PromptRequest;
use serde::Serialize;

/// Where a provider runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    /// Private node on the local network.
    Local,
    /// Public cloud API.
    Cloud,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Display name used in logs and audit events.
    fn name(&self) -> &str;

    fn tier(&self) -> ProviderTier;

    /// Produce an improved prompt, addressing the analyser's issues.
    /// Must not retry internally; the router owns failover.
    async fn transform(
        &self,
        request: &PromptRequest,
        issues: &[String],
    ) -> Result<String, ProviderError>;
}
