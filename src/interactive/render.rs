//! Terminal rendering of agents, the journal and the relationship graph

use std::env;
use std::fmt::Write as _;

use nu_ansi_term::{Color, Style};

use crate::world::{Agent, LogEntry, LogKind, Mood, RelationshipGraph, World};

const BAR_CELLS: usize = 10;
const MEMORIES_SHOWN: usize = 5;

/// Wrap width from `$COLUMNS`, 100 otherwise
pub fn wrap_width() -> usize {
    env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(100_usize)
        .clamp(40, 160)
}

pub fn mood_style(mood: Mood) -> Style {
    let (r, g, b) = mood.rgb();
    Style::new().fg(Color::Rgb(r, g, b))
}

fn dim() -> Style {
    Style::new().fg(Color::DarkGray)
}

/// Filled cells out of ten for a magnitude in 0..=100
fn cells(magnitude: u32) -> usize {
    usize::try_from(magnitude.min(100).div_ceil(10)).unwrap_or(BAR_CELLS)
}

pub fn intensity_bar(intensity: u8) -> String {
    let filled = cells(u32::from(intensity));
    format!(
        "{}{} {intensity}",
        "█".repeat(filled),
        dim().paint("░".repeat(BAR_CELLS - filled))
    )
}

pub fn affinity_bar(affinity: i32) -> String {
    let filled = cells(affinity.unsigned_abs());
    let color = if affinity < 0 { Color::Red } else { Color::Green };
    format!(
        "{}{} {affinity:+}",
        color.paint("█".repeat(filled)),
        dim().paint("░".repeat(BAR_CELLS - filled))
    )
}

pub fn log_line(entry: &LogEntry, width: usize) -> String {
    let style = match entry.kind {
        LogKind::System => Style::new().fg(Color::Yellow).bold(),
        LogKind::Interaction => Style::new().fg(Color::Cyan),
        LogKind::Action => Style::new(),
    };

    let clock = format!("[{}] ", entry.clock());
    let indent = " ".repeat(clock.len());
    let options = textwrap::Options::new(width)
        .initial_indent(&clock)
        .subsequent_indent(&indent);
    let wrapped = textwrap::fill(&entry.content, options);

    // Timestamp dimmed, body colored by kind
    let body = wrapped.get(clock.len()..).unwrap_or_default();
    format!("{}{}", dim().paint(clock.as_str()), style.paint(body))
}

pub fn log(entries: &[&LogEntry], width: usize) -> String {
    if entries.is_empty() {
        return dim().paint("  Журнал пуст.").to_string();
    }
    entries
        .iter()
        .map(|e| log_line(e, width))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn agent_row(agent: &Agent) -> String {
    let thinking = if agent.is_thinking {
        Color::Magenta.paint(" 💭").to_string()
    } else {
        String::new()
    };

    format!(
        "  {} {} {}{}\n     {} {}  {}",
        agent.mood.emoji(),
        Style::new().bold().paint(&agent.name),
        dim().paint(format!("({}, {})", agent.role, agent.id)),
        thinking,
        mood_style(agent.mood).paint(format!("{:<12}", agent.mood.label())),
        intensity_bar(agent.mood_intensity),
        dim().paint(&agent.current_action)
    )
}

pub fn agents(world: &World) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        Style::new().bold().paint(format!("Агенты ({}):", world.agents().len()))
    );
    for agent in world.agents() {
        let _ = writeln!(out, "{}", agent_row(agent));
    }
    out
}

/// Detail view: persona, relationships and the latest memories first
pub fn inspector(agent: &Agent, world: &World, width: usize) -> String {
    let mut out = String::new();
    let header = Style::new().bold();

    let _ = writeln!(
        out,
        "{} {}  {}",
        agent.mood.emoji(),
        header.paint(&agent.name),
        dim().paint(&agent.role)
    );
    let _ = writeln!(
        out,
        "{}",
        textwrap::fill(
            &agent.personality,
            textwrap::Options::new(width).initial_indent("  ").subsequent_indent("  ")
        )
    );
    let _ = writeln!(
        out,
        "  Настроение: {} {}",
        mood_style(agent.mood).paint(agent.mood.label()),
        intensity_bar(agent.mood_intensity)
    );
    let _ = writeln!(out, "  Действие:   {}", agent.current_action);

    let _ = writeln!(out, "\n{}", header.paint("Отношения:"));
    if agent.relationships.is_empty() {
        let _ = writeln!(out, "  {}", dim().paint("Нет связей."));
    }
    for rel in &agent.relationships {
        let name = world
            .agent(&rel.target_agent_id)
            .map_or(rel.target_agent_id.as_str(), |a| a.name.as_str());
        let _ = writeln!(out, "  {name:<16} {}", affinity_bar(rel.affinity));
    }

    let _ = writeln!(out, "\n{}", header.paint("Воспоминания:"));
    for memory in agent.recent_memories(MEMORIES_SHOWN).iter().rev() {
        let _ = writeln!(
            out,
            "{}",
            textwrap::fill(
                memory,
                textwrap::Options::new(width).initial_indent("  • ").subsequent_indent("    ")
            )
        );
    }

    out
}

pub fn graph(graph: &RelationshipGraph) -> String {
    if graph.links.is_empty() {
        return dim().paint("  Пока нет заметных связей.").to_string();
    }

    let name_of = |id: &str| {
        graph
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map_or_else(|| id.to_string(), |n| n.name.clone())
    };

    graph
        .links
        .iter()
        .map(|link| {
            format!(
                "  {} → {}  {}",
                name_of(&link.source),
                name_of(&link.target),
                affinity_bar(link.value)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Roster, WorldLimits};
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(10, 1)]
    #[case(11, 2)]
    #[case(100, 10)]
    #[case(250, 10)]
    fn test_cells(#[case] magnitude: u32, #[case] filled: usize) {
        assert_eq!(cells(magnitude), filled);
    }

    #[test]
    fn test_affinity_bar_sign() {
        assert!(affinity_bar(-35).ends_with("-35"));
        assert!(affinity_bar(20).ends_with("+20"));
    }

    #[test]
    fn test_log_line_wraps_with_hanging_indent() {
        let entry = LogEntry::new(LogKind::Action, "слово ".repeat(30), None);
        let line = log_line(&entry, 40);

        assert!(line.contains(&format!("[{}]", entry.clock())));
        assert!(line.lines().count() > 1);
        assert!(line.lines().skip(1).all(|l| l.starts_with(&" ".repeat(11))));
    }

    #[test]
    fn test_inspector_lists_relationships_and_latest_memory_first() {
        let world = World::new(Roster::builtin().into_agents(), WorldLimits::default());
        let agent = world.agents()[0].clone();
        let view = inspector(&agent, &world, 80);

        assert!(view.contains(&agent.name));
        assert!(view.contains("Отношения:"));

        let memories = agent.recent_memories(MEMORIES_SHOWN);
        if let (Some(first), Some(last)) = (memories.first(), memories.last()) {
            if first != last {
                let first_pos = view.find(first.as_str()).expect("first memory shown");
                let last_pos = view.find(last.as_str()).expect("last memory shown");
                assert!(last_pos < first_pos);
            }
        }
    }

    #[test]
    fn test_empty_graph_message() {
        let graph = RelationshipGraph::from_agents(&[], 10);
        assert!(super::graph(&graph).contains("Пока нет"));
    }
}
