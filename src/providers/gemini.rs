//! Google Gemini Provider
//!
//! API `generateContent` com system instruction e structured output (JSON).

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    http_client, ChatOptions, ChatResponse, GeminiConfig, Message, ModelInfo, Provider,
    ProviderError, ResponseFormat, Role, Usage,
};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            default_model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }

    /// Chave do config, depois `GEMINI_API_KEY`, depois `GOOGLE_API_KEY`
    pub fn from_config(config: &GeminiConfig, timeout_secs: u64) -> Option<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| env::var("GEMINI_API_KEY").ok())
            .or_else(|| env::var("GOOGLE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())?;

        let mut provider = Self::new(&api_key, timeout_secs);

        if let Some(ref url) = config.base_url {
            provider.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ref model) = config.default_model {
            provider.default_model = model.clone();
        }

        Some(provider)
    }

    /// A chave vai no header `x-goog-api-key`, nunca na URL
    fn endpoint_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

/// Converte mensagens para o formato Gemini.
///
/// Mensagens `system` viram `systemInstruction`; `assistant` vira `model`.
fn build_request(messages: &[Message], options: &ChatOptions) -> GenerateContentRequest {
    let system_text = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: Some(
                match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }
                .to_string(),
            ),
            parts: vec![ContentPart {
                text: m.content.clone(),
            }],
        })
        .collect();

    let (response_mime_type, response_schema) = match &options.response_format {
        ResponseFormat::Text => (None, None),
        ResponseFormat::Json { schema } => (Some("application/json".to_string()), schema.clone()),
    };

    GenerateContentRequest {
        system_instruction: (!system_text.is_empty()).then(|| Content {
            role: None,
            parts: vec![ContentPart { text: system_text }],
        }),
        contents,
        generation_config: GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_tokens,
            response_mime_type,
            response_schema,
        },
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gemini-2.5-flash", "Gemini 2.5 Flash - Fast").with_context(1_048_576),
            ModelInfo::new("gemini-2.5-pro", "Gemini 2.5 Pro - Most capable")
                .with_context(1_048_576),
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
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let request = build_request(messages, options);

        tracing::debug!("Gemini request to model {model}");

        let response = self
            .client
            .post(self.endpoint_url(&model))
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Gemini API error {status}: {text}");
            return Err(ProviderError::from_status(status, &text));
        }

        let gemini_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.without_url().to_string()))?;

        if gemini_response.is_blocked() {
            return Err(ProviderError::ApiError(
                "Response blocked by Gemini safety filters".to_string(),
            ));
        }

        let finish_reason = gemini_response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone());
        let content = gemini_response
            .text()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(ChatResponse {
            content,
            usage: gemini_response.usage_metadata.map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            finish_reason,
        })
    }
}

// Tipos da API Gemini

#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Texto concatenado do primeiro candidato
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        Some(text)
    }

    fn is_blocked(&self) -> bool {
        self.prompt_feedback
            .as_ref()
            .and_then(|pf| pf.block_reason.as_ref())
            .is_some()
            || self.candidates.is_empty()
    }
}
