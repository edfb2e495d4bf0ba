#![allow(clippy::too_many_lines)]

//! # Simulacrum
//!
//! A small world of LLM-driven personas. Each turn one idle agent is asked
//! by a language model what it does next; the answer moves its mood, its
//! memories and its relationships with the others. The player watches the
//! journal and can intervene with divine events or new arrivals.

pub mod brain;
pub mod config;
pub mod errors;
pub mod interactive;
pub mod providers;
pub mod sim;
pub mod world;

pub use errors::{Result, SimError};
pub use sim::Simulation;
