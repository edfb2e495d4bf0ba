//! Turns a [`TurnContext`] into an [`AgentAction`] through an LLM provider.

pub mod prompt;

use std::sync::Arc;
use std::time::Instant;

use crate::errors::Result;
use crate::providers::{ChatOptions, Message, Provider, ResponseFormat};
use crate::world::action::response_schema;
use crate::world::{AgentAction, TurnContext};

pub struct ActionDecider {
    provider: Arc<dyn Provider>,
    options: ChatOptions,
}

impl ActionDecider {
    /// JSON output is always requested; the schema is only honored by some providers.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            options: ChatOptions {
                response_format: ResponseFormat::Json {
                    schema: Some(response_schema()),
                },
                ..Default::default()
            },
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.options.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.options.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.options.max_tokens = max_tokens;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model_name(&self) -> &str {
        self.options
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn messages(ctx: &TurnContext) -> Vec<Message> {
        vec![
            Message::system(&prompt::system_prompt(ctx)),
            Message::user(prompt::USER_PROMPT),
        ]
    }

    pub async fn try_decide(&self, ctx: &TurnContext) -> Result<AgentAction> {
        let started = Instant::now();
        let response = self
            .provider
            .chat(&Self::messages(ctx), &self.options)
            .await?;

        tracing::debug!(
            "{} answered for {} in {:?} (finish: {:?}, tokens: {:?})",
            self.provider.name(),
            ctx.agent.id,
            started.elapsed(),
            response.finish_reason,
            response.usage.as_ref().map(|u| u.total_tokens)
        );

        AgentAction::parse(&response.content)
    }

    /// Never fails: provider or parse errors become the fallback action.
    pub async fn decide(&self, ctx: &TurnContext) -> AgentAction {
        match self.try_decide(ctx).await {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!(
                    "Decision for {} failed, using fallback: {e}",
                    ctx.agent.name
                );
                AgentAction::fallback(self.provider.name())
            }
        }
    }
}
