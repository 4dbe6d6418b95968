//! Backend provider configuration.
//!
//! Credentials and the local node address are resolved environment-first:
//! if the named variable is set and non-empty it wins, otherwise the value
//! written in the config file is used. A provider without a resolved
//! credential (or host) is left out of the failover chain.

use serde::{Deserialize, Serialize};

/// All backend providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// Local Ollama node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Node host or IP address.
    #[serde(default)]
    pub host: Option<String>,

    /// Environment variable containing the host.
    #[serde(default = "default_ollama_host_env")]
    pub host_env: Option<String>,

    #[serde(default = "default_ollama_port")]
    pub port: u16,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Display name used as the audit actor for local work.
    #[serde(default = "default_node_name")]
    pub node_name: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: None,
            host_env: default_ollama_host_env(),
            port: default_ollama_port(),
            model: default_ollama_model(),
            node_name: default_node_name(),
        }
    }
}

impl OllamaConfig {
    /// Get the node host, checking host_env first.
    pub fn resolve_host(&self) -> Option<String> {
        resolve(self.host_env.as_deref(), self.host.as_ref())
    }

    /// Base URL of the node, if a host is configured.
    pub fn base_url(&self) -> Option<String> {
        self.resolve_host()
            .map(|host| format!("http://{}:{}", host, self.port))
    }
}

/// Google Gemini.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable containing the API key.
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_gemini_key_env(),
            model: default_gemini_model(),
            endpoint: default_gemini_endpoint(),
        }
    }
}

impl GeminiConfig {
    /// Get the API key, checking api_key_env first.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve(self.api_key_env.as_deref(), self.api_key.as_ref())
    }
}

/// OpenRouter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable containing the API key.
    #[serde(default = "default_openrouter_key_env")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_openrouter_model")]
    pub model: String,

    #[serde(default = "default_openrouter_endpoint")]
    pub endpoint: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_openrouter_key_env(),
            model: default_openrouter_model(),
            endpoint: default_openrouter_endpoint(),
        }
    }
}

impl OpenRouterConfig {
    /// Get the API key, checking api_key_env first.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve(self.api_key_env.as_deref(), self.api_key.as_ref())
    }
}

fn resolve(env_var: Option<&str>, direct: Option<&String>) -> Option<String> {
    if let Some(env_var) = env_var
        && let Ok(value) = std::env::var(env_var)
        && !value.trim().is_empty()
    {
        return Some(value.trim().to_string());
    }
    direct.filter(|v| !v.trim().is_empty()).cloned()
}

fn default_ollama_host_env() -> Option<String> {
    Some("PROMPTC_NODE_HOST".to_string())
}

fn default_ollama_port() -> u16 {
    11434
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_node_name() -> String {
    "mac-mini".to_string()
}

fn default_gemini_key_env() -> Option<String> {
    Some("GEMINI_API_KEY".to_string())
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_openrouter_key_env() -> Option<String> {
    Some("OPENROUTER_API_KEY".to_string())
}

fn default_openrouter_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}

fn default_openrouter_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}
