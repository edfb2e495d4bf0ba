//! Ollama Provider
//!
//! Modelos locais via Ollama (OpenAI-compatible API).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::openai::{completion_body, read_completion};
use super::{
    chat_completions_url, http_client, ChatOptions, ChatResponse, Message, ModelInfo,
    OllamaConfig, Provider, ProviderError,
};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1/chat/completions";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Provider para Ollama (modelos locais)
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    default_model: String,
}

impl OllamaProvider {
    /// Cria provider a partir da configuração (URL e modelo opcionais)
    pub fn new(config: &OllamaConfig, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url: config
                .base_url
                .as_deref()
                .map_or_else(|| DEFAULT_OLLAMA_URL.to_string(), chat_completions_url),
            default_model: config
                .default_model
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_OLLAMA_MODEL)
                .to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tags_url(&self) -> String {
        self.base_url.replace("/v1/chat/completions", "/api/tags")
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn models(&self) -> Vec<ModelInfo> {
        // Modelos comuns do Ollama (lista estática)
        vec![
            ModelInfo::new("llama3.2", "Llama 3.2 - General purpose").with_context(131_072),
            ModelInfo::new("qwen2.5:3b", "Qwen 2.5 3B - Fast").with_context(32_768),
            ModelInfo::new("mistral", "Mistral 7B").with_context(32_768),
            ModelInfo::new("gemma2", "Gemma 2").with_context(8192),
        ]
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Modelos baixados no servidor (`/api/tags`)
    async fn installed_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(self.tags_url())
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::ConfigError(format!("Ollama not reachable at {}", self.tags_url()))
                } else {
                    ProviderError::NetworkError(e.without_url().to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &text));
        }

        let data: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.without_url().to_string()))?;

        Ok(data.models.into_iter().map(|m| m.name).collect())
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse, ProviderError> {
        let body = completion_body(messages, options, &self.default_model);

        let response = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::ConfigError(
                        "Ollama not running. Start with: ollama serve".to_string(),
                    )
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        read_completion(response).await
    }
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelInfo {
    name: String,
}
