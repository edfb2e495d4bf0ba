//! Agent records and their relationships.

use serde::{Deserialize, Serialize};

use super::mood::Mood;

pub const AFFINITY_MIN: i32 = -100;
pub const AFFINITY_MAX: i32 = 100;
pub const MOOD_INTENSITY_MAX: u8 = 100;

/// Interaction lines kept per relationship
pub const RELATIONSHIP_HISTORY_LIMIT: usize = 10;

/// One agent's disposition toward another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub target_agent_id: String,
    /// -100 to 100
    pub affinity: i32,
    /// Summary of interactions, newest last
    #[serde(default)]
    pub history: Vec<String>,
}

impl Relationship {
    pub fn new(target_agent_id: impl Into<String>, affinity: i32) -> Self {
        Self {
            target_agent_id: target_agent_id.into(),
            affinity: affinity.clamp(AFFINITY_MIN, AFFINITY_MAX),
            history: Vec::new(),
        }
    }

    fn record(&mut self, line: &str) {
        self.history.push(line.to_string());
        if self.history.len() > RELATIONSHIP_HISTORY_LIMIT {
            let excess = self.history.len() - RELATIONSHIP_HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}

/// A simulated persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// Free text handed to the model
    pub personality: String,
    pub role: String,
    pub mood: Mood,
    /// 0-100
    pub mood_intensity: u8,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Short-term event log, newest last
    #[serde(default)]
    pub memories: Vec<String>,
    pub current_action: String,
    #[serde(default)]
    pub is_thinking: bool,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            avatar: avatar_url(&name),
            name,
            personality: String::new(),
            role: role.into(),
            mood: Mood::Neutral,
            mood_intensity: 50,
            relationships: Vec::new(),
            memories: Vec::new(),
            current_action: String::new(),
            is_thinking: false,
        }
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    pub fn with_mood(mut self, mood: Mood, intensity: u8) -> Self {
        self.mood = mood;
        self.mood_intensity = intensity.min(MOOD_INTENSITY_MAX);
        self
    }

    pub fn with_memories<I, S>(mut self, memories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.memories = memories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.current_action = action.into();
        self
    }

    pub fn relationship(&self, target_id: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|r| r.target_agent_id == target_id)
    }

    /// Affinity toward `target_id`, 0 when they never interacted
    pub fn affinity_toward(&self, target_id: &str) -> i32 {
        self.relationship(target_id).map_or(0, |r| r.affinity)
    }

    /// Applies `delta` and returns the new, clamped affinity.
    pub fn adjust_affinity(&mut self, target_id: &str, delta: i32) -> i32 {
        match self
            .relationships
            .iter_mut()
            .find(|r| r.target_agent_id == target_id)
        {
            Some(rel) => {
                rel.affinity = rel
                    .affinity
                    .saturating_add(delta)
                    .clamp(AFFINITY_MIN, AFFINITY_MAX);
                rel.affinity
            }
            None => {
                let rel = Relationship::new(target_id, delta);
                let affinity = rel.affinity;
                self.relationships.push(rel);
                affinity
            }
        }
    }

    /// Appends to the relationship history, creating a neutral relationship if needed.
    pub fn record_interaction(&mut self, target_id: &str, line: &str) {
        if self.relationship(target_id).is_none() {
            self.relationships.push(Relationship::new(target_id, 0));
        }
        if let Some(rel) = self
            .relationships
            .iter_mut()
            .find(|r| r.target_agent_id == target_id)
        {
            rel.record(line);
        }
    }

    /// Appends a memory and keeps only the newest `limit`.
    pub fn remember(&mut self, memory: impl Into<String>, limit: usize) {
        self.memories.push(memory.into());
        if self.memories.len() > limit {
            let excess = self.memories.len() - limit;
            self.memories.drain(..excess);
        }
    }

    /// The newest `n` memories, oldest first
    pub fn recent_memories(&self, n: usize) -> &[String] {
        let start = self.memories.len().saturating_sub(n);
        &self.memories[start..]
    }

    pub fn raise_intensity(&mut self, by: u8) {
        self.mood_intensity = self.mood_intensity.saturating_add(by).min(MOOD_INTENSITY_MAX);
    }
}

pub fn avatar_url(seed: &str) -> String {
    format!("https://picsum.photos/seed/{seed}/200/200")
}
