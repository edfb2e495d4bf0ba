//! The shared world: cast, journal, global context and the turn flag.

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::AgentAction;
use super::agent::Agent;
use super::graph::RelationshipGraph;
use super::journal::{Journal, LogEntry, LogKind};
use crate::errors::{Result, SimError};

pub const DEFAULT_GLOBAL_CONTEXT: &str = "Мир спокоен.";

/// Bookkeeping limits of the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldLimits {
    /// Memories kept per agent
    pub memory_limit: usize,
    /// Journal entries kept
    pub journal_limit: usize,
    /// Journal lines shown to the acting agent
    pub recent_events: usize,
    /// Own memories shown to the acting agent
    pub prompt_memories: usize,
    /// |affinity| above which a relationship becomes a graph link
    pub graph_threshold: i32,
}

impl Default for WorldLimits {
    fn default() -> Self {
        Self {
            memory_limit: 20,
            journal_limit: 100,
            recent_events: 5,
            prompt_memories: 5,
            graph_threshold: 10,
        }
    }
}

/// Proof that a turn was started. Consumed by `finish_turn` or `abort_turn`.
#[derive(Debug, PartialEq, Eq)]
pub struct TurnTicket {
    agent_id: String,
}

impl TurnTicket {
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}

/// How the acting agent sees another agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acquaintance {
    pub id: String,
    pub name: String,
    pub role: String,
    /// Acting agent's affinity toward this one
    pub relationship: i32,
}

/// Everything the decider needs for one turn
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub agent: Agent,
    pub others: Vec<Acquaintance>,
    pub recent_events: Vec<String>,
    pub global_context: String,
    pub prompt_memories: usize,
}

/// Affinity change applied by a TALK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinityShift {
    pub speaker_delta: i32,
    pub speaker_affinity: i32,
    pub listener_delta: i32,
    pub listener_affinity: i32,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub agent_id: String,
    pub target_id: Option<String>,
    pub entry: LogEntry,
    pub affinity: Option<AffinityShift>,
}

/// Serializable view of the world
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub taken_at: chrono::DateTime<Utc>,
    pub ticks: u64,
    pub global_context: String,
    pub processing: Option<String>,
    pub agents: Vec<Agent>,
    pub logs: Vec<LogEntry>,
    pub graph: RelationshipGraph,
}

pub struct World {
    agents: Vec<Agent>,
    journal: Journal,
    global_context: String,
    /// Agent whose turn is in flight; the only turn lock
    processing: Option<String>,
    ticks: u64,
    limits: WorldLimits,
}

impl World {
    pub fn new(agents: Vec<Agent>, limits: WorldLimits) -> Self {
        Self {
            agents,
            journal: Journal::new(limits.journal_limit),
            global_context: DEFAULT_GLOBAL_CONTEXT.to_string(),
            processing: None,
            ticks: 0,
            limits,
        }
    }

    pub fn with_global_context(mut self, context: impl Into<String>) -> Self {
        self.global_context = context.into();
        self
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn global_context(&self) -> &str {
        &self.global_context
    }

    pub fn limits(&self) -> WorldLimits {
        self.limits
    }

    /// Completed turns
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_busy(&self) -> bool {
        self.processing.is_some()
    }

    pub fn processing(&self) -> Option<&str> {
        self.processing.as_deref()
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    fn agent_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// Lookup by exact id, then by case-insensitive name.
    pub fn find_agent(&self, key: &str) -> Option<&Agent> {
        let key = key.trim();
        self.agent(key).or_else(|| {
            let lower = key.to_lowercase();
            self.agents.iter().find(|a| a.name.to_lowercase() == lower)
        })
    }

    pub fn log(&mut self, kind: LogKind, content: impl Into<String>, agent_id: Option<&str>) -> LogEntry {
        self.journal
            .push(LogEntry::new(kind, content, agent_id))
            .clone()
    }

    /// Picks a random idle agent and marks it thinking.
    ///
    /// Returns `None` while another turn is in flight or when nobody is idle.
    pub fn begin_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<TurnTicket> {
        if let Some(ref busy) = self.processing {
            tracing::debug!("Turn skipped, {busy} is still thinking");
            return None;
        }

        let idle: Vec<&str> = self
            .agents
            .iter()
            .filter(|a| !a.is_thinking)
            .map(|a| a.id.as_str())
            .collect();
        let agent_id = (*idle.choose(rng)?).to_string();

        if let Some(agent) = self.agent_mut(&agent_id) {
            agent.is_thinking = true;
        }
        self.processing = Some(agent_id.clone());
        tracing::debug!("Turn started for {agent_id}");

        Some(TurnTicket { agent_id })
    }

    fn check_ticket(&self, ticket: &TurnTicket) -> Result<()> {
        match self.processing {
            Some(ref id) if *id == ticket.agent_id => Ok(()),
            _ => Err(SimError::StaleTurn(ticket.agent_id.clone())),
        }
    }

    pub fn turn_context(&self, ticket: &TurnTicket) -> Result<TurnContext> {
        self.check_ticket(ticket)?;
        let agent = self
            .agent(&ticket.agent_id)
            .ok_or_else(|| SimError::UnknownAgent(ticket.agent_id.clone()))?
            .clone();

        let others = self
            .agents
            .iter()
            .filter(|a| a.id != agent.id)
            .map(|a| Acquaintance {
                id: a.id.clone(),
                name: a.name.clone(),
                role: a.role.clone(),
                relationship: agent.affinity_toward(&a.id),
            })
            .collect();

        Ok(TurnContext {
            agent,
            others,
            recent_events: self.journal.recent_lines(self.limits.recent_events),
            global_context: self.global_context.clone(),
            prompt_memories: self.limits.prompt_memories,
        })
    }

    /// Folds the decision into the world and releases the turn.
    pub fn finish_turn(&mut self, ticket: TurnTicket, action: &AgentAction) -> Result<TurnOutcome> {
        self.check_ticket(&ticket)?;
        let result = self.apply_action(&ticket.agent_id, action);
        self.release(&ticket.agent_id);
        if result.is_ok() {
            self.ticks += 1;
        }
        result
    }

    /// Releases the turn without applying anything.
    pub fn abort_turn(&mut self, ticket: TurnTicket) {
        tracing::debug!("Turn aborted for {}", ticket.agent_id);
        self.release(&ticket.agent_id);
    }

    fn release(&mut self, agent_id: &str) {
        if let Some(agent) = self.agent_mut(agent_id) {
            agent.is_thinking = false;
        }
        if self.processing.as_deref() == Some(agent_id) {
            self.processing = None;
        }
    }

    fn apply_action(&mut self, agent_id: &str, action: &AgentAction) -> Result<TurnOutcome> {
        let speaker_name = self
            .agent(agent_id)
            .map(|a| a.name.clone())
            .ok_or_else(|| SimError::UnknownAgent(agent_id.to_string()))?;

        let mut affinity = None;
        let mut target_id = None;

        let line = match (action.is_talk(), action.target_agent_id.as_deref()) {
            (true, Some(target)) => {
                let target_name = self.agent(target).map(|a| a.name.clone());
                let line = format!(
                    "{} говорит {}: \"{}\"",
                    speaker_name,
                    target_name.as_deref().unwrap_or("Unknown"),
                    action.content
                );

                if target_name.is_some() && target != agent_id {
                    target_id = Some(target.to_string());
                    affinity = self.shift_affinity(agent_id, target, action.affinity_change);
                    self.record_interaction(agent_id, target, &line);
                } else if target == agent_id {
                    tracing::debug!("{agent_id} talks to itself, affinity untouched");
                }
                line
            }
            _ => format!("{} ({}): {}", speaker_name, action.action_type, action.content),
        };

        let kind = if action.is_talk() {
            LogKind::Interaction
        } else {
            LogKind::Action
        };
        let entry = self.log(kind, line.clone(), Some(agent_id));

        let memory_limit = self.limits.memory_limit;
        if let Some(agent) = self.agent_mut(agent_id) {
            agent.current_action = if action.is_talk() {
                "Говорит".to_string()
            } else {
                let head: String = action.content.chars().take(30).collect();
                format!("{head}...")
            };
            if let Some(mood) = action.new_mood {
                agent.mood = mood;
            }
            agent.remember(line, memory_limit);
        }

        tracing::info!("{}", entry.content);

        Ok(TurnOutcome {
            agent_id: agent_id.to_string(),
            target_id,
            entry,
            affinity,
        })
    }

    /// Speaker moves by `delta`, listener by `floor(delta / 2)`.
    fn shift_affinity(&mut self, speaker: &str, listener: &str, delta: Option<i32>) -> Option<AffinityShift> {
        let delta = delta.filter(|d| *d != 0)?;
        let listener_delta = delta.div_euclid(2);

        let speaker_affinity = self.agent_mut(speaker)?.adjust_affinity(listener, delta);
        let listener_affinity = self
            .agent_mut(listener)?
            .adjust_affinity(speaker, listener_delta);

        Some(AffinityShift {
            speaker_delta: delta,
            speaker_affinity,
            listener_delta,
            listener_affinity,
        })
    }

    fn record_interaction(&mut self, speaker: &str, listener: &str, line: &str) {
        if let Some(agent) = self.agent_mut(speaker) {
            agent.record_interaction(listener, line);
        }
        if let Some(agent) = self.agent_mut(listener) {
            agent.record_interaction(speaker, line);
        }
    }

    /// Player-injected event: becomes the global context and stirs every agent.
    pub fn divine_event(&mut self, text: &str) -> Result<LogEntry> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SimError::invalid_input("event", "must not be empty"));
        }

        let entry = self.log(LogKind::System, format!("БОГ: {text}"), None);
        self.global_context = text.to_string();
        for agent in &mut self.agents {
            agent.raise_intensity(10);
        }

        tracing::info!("Global context changed: {text}");
        Ok(entry)
    }

    pub fn add_agent(&mut self, name: &str, role: &str, persona: &str) -> Result<&Agent> {
        let (name, role, persona) = (name.trim(), role.trim(), persona.trim());
        if name.is_empty() {
            return Err(SimError::invalid_input("name", "must not be empty"));
        }
        if role.is_empty() {
            return Err(SimError::invalid_input("role", "must not be empty"));
        }

        let id = format!("agent-{}", Uuid::new_v4().simple());
        let agent = Agent::new(id, name, role)
            .with_personality(persona)
            .with_memories(["Я прибыл в этот мир."])
            .with_action("Только что прибыл");

        self.agents.push(agent);
        self.log(
            LogKind::System,
            format!("В мир прибыл новый агент: {name} ({role})"),
            None,
        );

        Ok(&self.agents[self.agents.len() - 1])
    }

    pub fn graph(&self) -> RelationshipGraph {
        RelationshipGraph::from_agents(&self.agents, self.limits.graph_threshold)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            taken_at: Utc::now(),
            ticks: self.ticks,
            global_context: self.global_context.clone(),
            processing: self.processing.clone(),
            agents: self.agents.clone(),
            logs: self.journal.to_vec(),
            graph: self.graph(),
        }
    }
}
