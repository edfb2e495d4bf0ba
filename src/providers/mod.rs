//! LLM Provider Abstraction Layer
//!
//! Interface única para os endpoints que decidem as ações dos agentes:
//! - Ollama (local, OpenAI-compatible)
//! - OpenAI (e compatíveis)
//! - Gemini (Google)

mod gemini;
mod ollama;
mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;

/// Timeout padrão das requisições HTTP
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Informações sobre um modelo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub description: String,
    pub context_length: usize,
}

impl ModelInfo {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            context_length: 8192,
        }
    }

    pub fn with_context(mut self, length: usize) -> Self {
        self.context_length = length;
        self
    }
}

/// Mensagem de chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }

    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
        }
    }
}

/// Role da mensagem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Formato de resposta pedido ao modelo
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// JSON puro; o schema é usado pelos providers que suportam structured output
    Json { schema: Option<Value> },
}

impl ResponseFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, ResponseFormat::Json { .. })
    }
}

/// Opções de chat
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub response_format: ResponseFormat,
}

/// Resposta completa
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}

/// Uso de tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Trait principal para providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Nome do provider
    fn name(&self) -> &str;

    /// Modelos conhecidos
    fn models(&self) -> Vec<ModelInfo>;

    /// Modelo padrão
    fn default_model(&self) -> &str;

    /// Chat completion (uma requisição, uma resposta)
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse, ProviderError>;

    /// Modelos disponíveis no servidor; vazio quando o provider não lista
    async fn installed_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Erros do provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// Mapeia status HTTP de erro para a variante adequada
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::InvalidApiKey,
            429 => ProviderError::RateLimited,
            _ => ProviderError::ApiError(format!("{status}: {body}")),
        }
    }
}

/// Configuração global de providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAIConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
}

/// Garante que a URL aponte para `/chat/completions`
pub fn chat_completions_url(base_url: &str) -> String {
    let url = base_url.trim().trim_end_matches('/');
    if url.contains("/chat/completions") {
        url.to_string()
    } else if url.ends_with("/v1") {
        format!("{url}/chat/completions")
    } else {
        format!("{url}/v1/chat/completions")
    }
}

/// Cliente HTTP compartilhado com timeout
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("simulacrum/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build HTTP client with timeout: {e}");
            Client::new()
        })
}

/// Registry de providers
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registra um provider
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    /// Obtém provider por nome
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Lista todos os providers
    pub fn list(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Cria registry com providers configurados
pub fn create_registry(config: &ProvidersConfig, timeout_secs: u64) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    // Ollama (local, sempre disponível)
    let ollama_config = config.ollama.clone().unwrap_or_default();
    registry.register(Arc::new(OllamaProvider::new(&ollama_config, timeout_secs)));

    // OpenAI
    let openai_config = config.openai.clone().unwrap_or_default();
    match OpenAIProvider::from_config(&openai_config, timeout_secs) {
        Some(provider) => registry.register(Arc::new(provider)),
        None => tracing::debug!("OpenAI provider skipped: no API key"),
    }

    // Gemini
    let gemini_config = config.gemini.clone().unwrap_or_default();
    match GeminiProvider::from_config(&gemini_config, timeout_secs) {
        Some(provider) => registry.register(Arc::new(provider)),
        None => tracing::debug!("Gemini provider skipped: no API key"),
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");

        let msg = Message::system("You are Alexei");
        assert_eq!(msg.role.as_str(), "system");
    }

    #[test]
    fn test_chat_completions_url() {
        assert_eq!(
            chat_completions_url("http://localhost:11434/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("http://localhost:11434/v1"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ProviderError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited
        ));
        assert!(matches!(
            ProviderError::from_status(reqwest::StatusCode::UNAUTHORIZED, ""),
            ProviderError::InvalidApiKey
        ));
        assert!(matches!(
            ProviderError::from_status(reqwest::StatusCode::BAD_GATEWAY, "down"),
            ProviderError::ApiError(_)
        ));
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(OllamaProvider::new(&OllamaConfig::default(), 5)));

        assert!(registry.get("Ollama").is_some());
        assert!(registry.get("openai").is_none());
        assert_eq!(registry.list(), vec!["ollama"]);
    }
}
