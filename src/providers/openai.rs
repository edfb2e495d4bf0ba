//! `OpenAI` Provider
//!
//! Suporta `OpenAI` API e compatíveis (Azure, Together, Ollama, etc.)

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    chat_completions_url, http_client, ChatOptions, ChatResponse, Message, ModelInfo,
    OpenAIConfig, Provider, ProviderError, Usage,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.to_string(),
            base_url: OPENAI_API_URL.to_string(),
            default_model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = chat_completions_url(url);
        self
    }

    /// Retorna `None` quando não há chave no config nem em `OPENAI_API_KEY`
    pub fn from_config(config: &OpenAIConfig, timeout_secs: u64) -> Option<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())?;

        let mut provider = Self::new(&api_key, timeout_secs);

        if let Some(url) = config
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
        {
            provider = provider.with_base_url(&url);
        }

        if let Some(ref model) = config.default_model {
            provider.default_model = model.clone();
        }

        Some(provider)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gpt-4o-mini", "GPT-4o Mini - Fast and cheap").with_context(128_000),
            ModelInfo::new("gpt-4o", "GPT-4o - Latest multimodal").with_context(128_000),
            ModelInfo::new("gpt-4.1-mini", "GPT-4.1 Mini").with_context(1_000_000),
        ]
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse, ProviderError> {
        let body = completion_body(messages, options, &self.default_model);

        let request = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        read_completion(response).await
    }
}

/// Monta o corpo de uma requisição `/chat/completions`
pub(crate) fn completion_body(
    messages: &[Message],
    options: &ChatOptions,
    default_model: &str,
) -> Value {
    let model = options
        .model
        .clone()
        .unwrap_or_else(|| default_model.to_string());

    let wire_messages: Vec<CompatMessage> = messages
        .iter()
        .map(|m| CompatMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect();

    let mut body = json!({
        "model": model,
        "messages": wire_messages,
        "stream": false,
    });

    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    if let Some(temp) = options.temperature {
        body["temperature"] = json!(temp);
    }

    if options.response_format.is_json() {
        body["response_format"] = json!({ "type": "json_object" });
    }

    body
}

/// Lê a resposta de um endpoint OpenAI-compatible
pub(crate) async fn read_completion(
    response: reqwest::Response,
) -> Result<ChatResponse, ProviderError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        tracing::warn!("Chat completion failed with {status}: {text}");

        return Err(ProviderError::from_status(status, &text));
    }

    let api_response: CompatResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::ParseError(e.to_string()))?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ParseError("No choices".to_string()))?;

    let content = choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)?;

    Ok(ChatResponse {
        content,
        usage: api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        finish_reason: choice.finish_reason,
    })
}

// Tipos OpenAI-compatible

#[derive(Debug, Serialize)]
struct CompatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompatResponse {
    choices: Vec<CompatChoice>,
    usage: Option<CompatUsage>,
}

#[derive(Debug, Deserialize)]
struct CompatChoice {
    message: CompatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}
