//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use simulacrum::brain::ActionDecider;
use simulacrum::providers::{ChatOptions, ChatResponse, Message, ModelInfo, Provider, ProviderError};
use simulacrum::world::{Agent, World, WorldLimits};
use simulacrum::Simulation;

type Script = dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync;

/// Provider answering from a closure over the system prompt.
pub struct ScriptedProvider {
    script: Box<Script>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedProvider {
    pub fn new(script: impl Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            gate: None,
        }
    }

    /// Every call waits for `gate.notify_one()` before answering
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo::new("script-1", "Scripted replies")]
    }

    fn default_model(&self) -> &str {
        "script-1"
    }

    async fn chat(&self, messages: &[Message], _options: &ChatOptions) -> Result<ChatResponse, ProviderError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let system = messages
            .iter()
            .find(|m| m.role.as_str() == "system")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        (self.script)(&system).map(|content| ChatResponse {
            content,
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Provider that never answers
pub struct SilentProvider;

#[async_trait]
impl Provider for SilentProvider {
    fn name(&self) -> &str {
        "silent"
    }

    fn models(&self) -> Vec<ModelInfo> {
        Vec::new()
    }

    fn default_model(&self) -> &str {
        "none"
    }

    async fn chat(&self, _messages: &[Message], _options: &ChatOptions) -> Result<ChatResponse, ProviderError> {
        std::future::pending().await
    }
}

/// Алиса (a) and Борис (b)
pub fn pair_world() -> World {
    World::new(
        vec![
            Agent::new("a", "Алиса", "Инженер").with_personality("Прямая"),
            Agent::new("b", "Борис", "Повар").with_personality("Весёлый"),
        ],
        WorldLimits::default(),
    )
}

/// Whoever acts talks to the other one
pub fn talk_to_other(affinity: i32) -> impl Fn(&str) -> Result<String, ProviderError> + Send + Sync {
    move |system: &str| {
        let target = if system.contains("Твое имя: Алиса.") { "b" } else { "a" };
        Ok(format!(
            r#"{{"actionType":"TALK","targetAgentId":"{target}","content":"Привет!","newMood":"Счастье","affinityChange":{affinity}}}"#
        ))
    }
}

pub fn simulation(world: World, provider: impl Provider + 'static) -> Simulation {
    Simulation::new(world, ActionDecider::new(Arc::new(provider))).with_seed(7)
}
