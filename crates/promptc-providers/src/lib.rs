//! # promptc-providers
//!
//! Concrete backends for the failover [`Router`](promptc_runtime::Router):
//!
//! | Provider | Tier | Endpoint |
//! |----------|------|----------|
//! | [`OllamaProvider`] | local | `POST {node}/api/generate` |
//! | [`GeminiProvider`] | cloud | `POST {endpoint}/models/{model}:generateContent` |
//! | [`OpenRouterProvider`] | cloud | `POST {endpoint}` (chat completions) |
//!
//! [`build_chain`] assembles them in failover order from an [`AgentConfig`];
//! [`build_probe`] returns the liveness probe for the local node.

mod http;
mod instruction;

pub mod gemini;
pub mod ollama;
pub mod openrouter;
pub mod probe;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openrouter::OpenRouterProvider;
pub use probe::HttpProbe;

use promptc_core::AgentConfig;
use promptc_runtime::{HealthProbe, Provider};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to build HTTP client for {provider}: {source}")]
    Client {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Providers in failover order: local node first, then Gemini, then OpenRouter.
///
/// The local node is included only in enterprise mode with a resolved host.
/// Cloud providers without a resolved API key are skipped with a warning.
pub fn build_chain(config: &AgentConfig) -> Result<Vec<Arc<dyn Provider>>, BuildError> {
    let attempt_timeout = config.router.attempt_timeout();
    let providers = &config.providers;
    let mut chain: Vec<Arc<dyn Provider>> = Vec::new();

    if config.local_node_enabled() {
        if let Some(base) = providers.ollama.base_url() {
            let ollama = OllamaProvider::new(&base, &providers.ollama.model, attempt_timeout)
                .map_err(|source| BuildError::Client {
                    provider: "ollama",
                    source,
                })?;
            chain.push(Arc::new(ollama));
        }
    } else {
        tracing::info!(mode = %config.mode, "Local node disabled; cloud providers only");
    }

    match providers.gemini.resolve_api_key() {
        Some(key) => {
            let gemini = GeminiProvider::new(
                &providers.gemini.endpoint,
                &providers.gemini.model,
                key,
                attempt_timeout,
            )
            .map_err(|source| BuildError::Client {
                provider: "gemini",
                source,
            })?;
            chain.push(Arc::new(gemini));
        }
        None => tracing::warn!("Gemini API key not set; provider skipped"),
    }

    match providers.openrouter.resolve_api_key() {
        Some(key) => {
            let openrouter = OpenRouterProvider::new(
                &providers.openrouter.endpoint,
                &providers.openrouter.model,
                key,
                attempt_timeout,
            )
            .map_err(|source| BuildError::Client {
                provider: "openrouter",
                source,
            })?;
            chain.push(Arc::new(openrouter));
        }
        None => tracing::warn!("OpenRouter API key not set; provider skipped"),
    }

    if chain.is_empty() {
        tracing::warn!("No providers configured; weak prompts will be formatted locally");
    } else {
        tracing::info!(
            providers = ?chain.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            "Failover chain ready"
        );
    }

    Ok(chain)
}

/// Liveness probe for the local node, if the node is enabled.
pub fn build_probe(config: &AgentConfig) -> Result<Option<Arc<dyn HealthProbe>>, BuildError> {
    if !config.local_node_enabled() {
        return Ok(None);
    }
    let Some(base) = config.providers.ollama.base_url() else {
        return Ok(None);
    };

    let probe = HttpProbe::new(&base, &config.health.liveness_path, config.health.timeout())
        .map_err(|source| BuildError::Client {
            provider: "ollama probe",
            source,
        })?;
    Ok(Some(Arc::new(probe)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use promptc_core::Mode;
    use promptc_runtime::ProviderTier;

    fn config_without_env() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.providers.ollama.host_env = None;
        config.providers.gemini.api_key_env = None;
        config.providers.openrouter.api_key_env = None;
        config
    }

    #[test]
    fn test_full_chain_order() {
        let mut config = config_without_env();
        config.providers.ollama.host = Some("10.0.0.7".into());
        config.providers.gemini.api_key = Some("g".into());
        config.providers.openrouter.api_key = Some("o".into());

        let chain = build_chain(&config).unwrap();
        let names: Vec<_> = chain.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "ollama (llama3)",
                "gemini (gemini-1.5-flash)",
                "openrouter (anthropic/claude-3.5-sonnet)"
            ]
        );
        assert_eq!(chain[0].tier(), ProviderTier::Local);
        assert!(build_probe(&config).unwrap().is_some());
    }

    #[test]
    fn test_community_mode_skips_local_node() {
        let mut config = config_without_env();
        config.mode = Mode::Community;
        config.providers.ollama.host = Some("10.0.0.7".into());
        config.providers.openrouter.api_key = Some("o".into());

        let chain = build_chain(&config).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].tier(), ProviderTier::Cloud);
        assert!(build_probe(&config).unwrap().is_none());
    }

    #[test]
    fn test_missing_credentials_yield_empty_chain() {
        let config = config_without_env();
        assert!(build_chain(&config).unwrap().is_empty());
        assert!(build_probe(&config).unwrap().is_none());
    }

    #[test]
    fn test_blank_key_is_skipped() {
        let mut config = config_without_env();
        config.providers.gemini.api_key = Some("   ".into());
        assert!(build_chain(&config).unwrap().is_empty());
    }
}
