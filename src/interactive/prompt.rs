//! Custom prompt for the simulation REPL
//!
//! Shows: provider:model ... [▶ 3x · 42]

use std::borrow::Cow;

use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};

use crate::sim::Simulation;

#[derive(Default)]
pub struct SimPrompt {
    left: String,
    right: String,
}

impl SimPrompt {
    pub fn new(sim: &Simulation) -> Self {
        let mut prompt = Self::default();
        prompt.update(sim);
        prompt
    }

    /// Refresh from the current simulation state
    pub fn update(&mut self, sim: &Simulation) {
        let decider = sim.decider();
        self.left = format!(
            "\x1b[33m{}\x1b[0m:\x1b[36m{}\x1b[0m ",
            decider.provider_name(),
            shorten_model_name(decider.model_name())
        );

        let state = sim.state();
        let marker = if state.is_playing { "▶" } else { "⏸" };
        self.right = format!(
            "\x1b[90m[{marker} {}x · {}]\x1b[0m",
            state.speed, state.ticks
        );
    }
}

impl Prompt for SimPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.left)
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.right)
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => Cow::Borrowed("\x1b[32m❯\x1b[0m "),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Normal => Cow::Borrowed("\x1b[33m❮\x1b[0m "),
                reedline::PromptViMode::Insert => Cow::Borrowed("\x1b[32m❯\x1b[0m "),
            },
            PromptEditMode::Custom(_) => Cow::Borrowed("> "),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("\x1b[90m··· \x1b[0m")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        Cow::Owned(format!(
            "\x1b[90m({}search: {})\x1b[0m ",
            prefix, history_search.term
        ))
    }
}

/// "org/model-name" → "model-name", capped at 20 chars
fn shorten_model_name(model: &str) -> &str {
    let name = model.rsplit('/').next().unwrap_or(model);
    match name.char_indices().nth(20) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}
