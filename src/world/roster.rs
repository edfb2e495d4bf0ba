//! Starting cast.
//!
//! The built-in roster is the four residents of the station. A custom cast
//! can be loaded from TOML:
//!
//! ```toml
//! [[agents]]
//! id = "agent-1"
//! name = "Алексей"
//! role = "Архивариус"
//! personality = "Аналитический, спокойный"
//! mood = "Спокойствие"
//! mood_intensity = 50
//! memories = ["Я помню день своего создания."]
//! current_action = "Анализирует данные"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::agent::{avatar_url, Agent};
use super::mood::Mood;
use crate::errors::{Result, SimError};

/// Serializable description of a starting agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub role: String,
    pub personality: String,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default = "default_intensity")]
    pub mood_intensity: u8,
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default)]
    pub current_action: String,
    /// Seed for the avatar URL, defaults to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_seed: Option<String>,
}

fn default_intensity() -> u8 {
    50
}

impl Persona {
    pub fn into_agent(self) -> Agent {
        let seed = self.avatar_seed.clone().unwrap_or_else(|| self.id.clone());
        let mut agent = Agent::new(self.id, self.name, self.role)
            .with_personality(self.personality)
            .with_mood(self.mood, self.mood_intensity)
            .with_memories(self.memories)
            .with_action(self.current_action);
        agent.avatar = avatar_url(&seed);
        agent
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub agents: Vec<Persona>,
}

impl Roster {
    pub fn builtin() -> Self {
        let persona = |id: &str,
                       seed: &str,
                       name: &str,
                       role: &str,
                       personality: &str,
                       mood: Mood,
                       intensity: u8,
                       memories: [&str; 2],
                       action: &str| Persona {
            id: id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            personality: personality.to_string(),
            mood,
            mood_intensity: intensity,
            memories: memories.iter().map(|m| (*m).to_string()).collect(),
            current_action: action.to_string(),
            avatar_seed: Some(seed.to_string()),
        };

        Self {
            agents: vec![
                persona(
                    "agent-1",
                    "alex",
                    "Алексей",
                    "Архивариус",
                    "Аналитический, спокойный, любит философию и порядок. Скептически относится к новому.",
                    Mood::Neutral,
                    50,
                    ["Я помню день своего создания.", "В архиве сегодня было тихо."],
                    "Анализирует данные",
                ),
                persona(
                    "agent-2",
                    "maria",
                    "Мария",
                    "Художник",
                    "Энергичная, творческая, импульсивная. Любит общение и искусство.",
                    Mood::Happy,
                    80,
                    ["Нарисовала отличную картину.", "Хочу найти вдохновение."],
                    "Ищет краски",
                ),
                persona(
                    "agent-3",
                    "dmitry",
                    "Дмитрий",
                    "Инженер",
                    "Ворчливый, подозрительный, но очень преданный друзьям. Любит технику.",
                    Mood::Tired,
                    60,
                    ["Починил генератор.", "Шум вентиляции меня раздражает."],
                    "Проверяет системы",
                ),
                persona(
                    "agent-4",
                    "elena",
                    "Елена",
                    "Биолог",
                    "Заботливая, эмпатичная, всегда старается помирить остальных. Любит природу.",
                    Mood::Curious,
                    70,
                    ["Полила растения в оранжерее.", "Алексей кажется грустным."],
                    "Наблюдает за ростом",
                ),
            ],
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let roster: Roster = toml::from_str(content)
            .map_err(|e| SimError::ConfigurationError(format!("Invalid roster: {e}")))?;
        roster.validate()?;
        Ok(roster)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SimError::file_access(path, e))?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SimError::SerializationError(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(SimError::ConfigurationError(
                "Roster must contain at least one agent".to_string(),
            ));
        }
        for (i, persona) in self.agents.iter().enumerate() {
            if persona.id.trim().is_empty() || persona.name.trim().is_empty() {
                return Err(SimError::ConfigurationError(format!(
                    "Roster entry {i} needs a non-empty id and name"
                )));
            }
            if self.agents[..i].iter().any(|p| p.id == persona.id) {
                return Err(SimError::ConfigurationError(format!(
                    "Duplicate agent id in roster: {}",
                    persona.id
                )));
            }
        }
        Ok(())
    }

    pub fn into_agents(self) -> Vec<Agent> {
        self.agents.into_iter().map(Persona::into_agent).collect()
    }
}
