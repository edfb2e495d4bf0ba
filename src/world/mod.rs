//! Simulation world: agents, moods, the event journal and turn bookkeeping.

pub mod action;
pub mod agent;
pub mod graph;
pub mod journal;
pub mod mood;
pub mod roster;
pub mod state;

pub use action::{ActionType, AgentAction};
pub use agent::{Agent, Relationship};
pub use graph::RelationshipGraph;
pub use journal::{Journal, LogEntry, LogKind};
pub use mood::Mood;
pub use roster::{Persona, Roster};
pub use state::{
    Acquaintance, AffinityShift, TurnContext, TurnOutcome, TurnTicket, World, WorldLimits,
    WorldSnapshot,
};
