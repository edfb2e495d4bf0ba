//! World event log.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogKind {
    Action,
    System,
    Interaction,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogKind::Action => "ACTION",
            LogKind::System => "SYSTEM",
            LogKind::Interaction => "INTERACTION",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub content: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, content: impl Into<String>, agent_id: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent_id: agent_id.map(str::to_string),
            kind,
            content: content.into(),
        }
    }

    /// `HH:MM:SS` in local time
    pub fn clock(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    }

    /// `[HH:MM:SS] content`, the form agents see in their prompt
    pub fn prompt_line(&self) -> String {
        format!("[{}] {}", self.clock(), self.content)
    }
}

/// Bounded log, oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct Journal {
    entries: VecDeque<LogEntry>,
    limit: usize,
}

impl Journal {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, entry: LogEntry) -> &LogEntry {
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The newest `n` entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn recent_lines(&self, n: usize) -> Vec<String> {
        self.recent(n).map(LogEntry::prompt_line).collect()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_evicts_oldest() {
        let mut journal = Journal::new(3);
        for i in 0..5 {
            journal.push(LogEntry::new(LogKind::System, format!("e{i}"), None));
        }

        assert_eq!(journal.len(), 3);
        let contents: Vec<_> = journal.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn test_recent_lines_format() {
        let mut journal = Journal::new(100);
        journal.push(LogEntry::new(LogKind::Action, "first", Some("agent-1")));
        journal.push(LogEntry::new(LogKind::Action, "second", Some("agent-1")));

        let lines = journal.recent_lines(5);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[1].ends_with("] second"));
        // [HH:MM:SS] plus a space
        assert_eq!(lines[0].find(']'), Some(9));
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let entry = LogEntry::new(LogKind::Interaction, "hi", Some("agent-2"));
        let json = serde_json::to_value(&entry).expect("serialize");

        assert_eq!(json["type"], "INTERACTION");
        assert_eq!(json["agentId"], "agent-2");
    }
}
