//! Relationship graph export.
//!
//! Produces nodes and links for an external renderer. No layout is computed.

use std::fmt::Write as _;

use serde::Serialize;

use super::agent::Agent;
use super::mood::Mood;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub role: String,
    pub mood: Mood,
    pub color: &'static str,
    pub emoji: &'static str,
    pub is_thinking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    /// Source agent's affinity toward target
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationshipGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl RelationshipGraph {
    /// Keeps relationships with `|affinity| > threshold` whose target still exists.
    pub fn from_agents(agents: &[Agent], threshold: i32) -> Self {
        let nodes = agents
            .iter()
            .map(|a| GraphNode {
                id: a.id.clone(),
                name: a.name.clone(),
                role: a.role.clone(),
                mood: a.mood,
                color: a.mood.color(),
                emoji: a.mood.emoji(),
                is_thinking: a.is_thinking,
            })
            .collect();

        let links = agents
            .iter()
            .flat_map(|source| {
                source
                    .relationships
                    .iter()
                    .filter(|rel| rel.affinity.abs() > threshold)
                    .filter(|rel| agents.iter().any(|a| a.id == rel.target_agent_id))
                    .map(|rel| GraphLink {
                        source: source.id.clone(),
                        target: rel.target_agent_id.clone(),
                        value: rel.affinity,
                    })
            })
            .collect();

        Self { nodes, links }
    }

    /// Graphviz rendering; green edges for sympathy, red for hostility.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph relationships {\n  node [shape=circle, style=filled];\n");

        for node in &self.nodes {
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{} {}\\n{}\", fillcolor=\"{}\"];",
                escape(&node.id),
                node.emoji,
                escape(&node.name),
                escape(&node.role),
                node.color
            );
        }

        for link in &self.links {
            let color = if link.value > 0 { "#4ade80" } else { "#f87171" };
            let width = 1.0 + f64::from(link.value.unsigned_abs()) / 25.0;
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\", color=\"{}\", penwidth={:.1}];",
                escape(&link.source),
                escape(&link.target),
                link.value,
                color,
                width
            );
        }

        out.push_str("}\n");
        out
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast() -> Vec<Agent> {
        let mut a = Agent::new("a", "Алексей", "Архивариус");
        let b = Agent::new("b", "Мария", "Художник").with_mood(Mood::Happy, 80);
        a.adjust_affinity("b", 11);
        a.adjust_affinity("ghost", 50);
        vec![a, b]
    }

    #[test]
    fn test_links_respect_threshold_and_existing_targets() {
        let mut agents = cast();
        agents[1].adjust_affinity("a", -10);

        let graph = RelationshipGraph::from_agents(&agents, 10);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(
            graph.links,
            vec![GraphLink {
                source: "a".to_string(),
                target: "b".to_string(),
                value: 11,
            }]
        );
        assert_eq!(graph.nodes[1].color, "#4ade80");
    }

    #[test]
    fn test_dot_output() {
        let dot = RelationshipGraph::from_agents(&cast(), 10).to_dot();

        assert!(dot.starts_with("digraph relationships {"));
        assert!(dot.contains("\"a\" -> \"b\" [label=\"11\""));
        assert!(!dot.contains("ghost"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
