//! The decision an agent takes in a turn.
//!
//! Models answer with a flat JSON object:
//!
//! ```json
//! {"actionType":"TALK","targetAgentId":"agent-2","content":"Привет!","newMood":"Счастье","affinityChange":3}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::mood::Mood;
use crate::errors::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Talk,
    Think,
    Work,
    Rest,
    Move,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        ActionType::Talk,
        ActionType::Think,
        ActionType::Work,
        ActionType::Rest,
        ActionType::Move,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Talk => "TALK",
            ActionType::Think => "THINK",
            ActionType::Work => "WORK",
            ActionType::Rest => "REST",
            ActionType::Move => "MOVE",
        }
    }

    pub fn parse(text: &str) -> Option<ActionType> {
        let needle = text.trim();
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAction {
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_agent_id: Option<String>,
    /// What they say or think
    pub content: String,
    /// `None` when the model answered with a mood we do not know
    pub new_mood: Option<Mood>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity_change: Option<i32>,
}

/// Loose shape of the model reply before validation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    action_type: Option<String>,
    #[serde(default)]
    target_agent_id: Option<Value>,
    content: Option<String>,
    new_mood: Option<String>,
    #[serde(default)]
    affinity_change: Option<Value>,
}

impl AgentAction {
    /// Parses a model reply.
    ///
    /// Markdown fences and prose around the object are ignored. `actionType`,
    /// a non-empty `content` and `newMood` are required.
    pub fn parse(text: &str) -> Result<Self> {
        let object = extract_json_object(text)
            .ok_or_else(|| SimError::InvalidAction("no JSON object in reply".to_string()))?;

        let raw: RawAction = serde_json::from_str(object)
            .map_err(|e| SimError::InvalidAction(format!("malformed JSON: {e}")))?;

        let action_type = raw
            .action_type
            .as_deref()
            .and_then(ActionType::parse)
            .ok_or_else(|| {
                SimError::InvalidAction(format!("bad actionType: {:?}", raw.action_type))
            })?;

        let content = raw
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| SimError::InvalidAction("missing content".to_string()))?;

        let mood_text = raw
            .new_mood
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| SimError::InvalidAction("missing newMood".to_string()))?;
        let new_mood = Mood::parse(&mood_text);
        if new_mood.is_none() {
            tracing::warn!("Unknown mood in reply: {mood_text}");
        }

        Ok(Self {
            action_type,
            target_agent_id: raw.target_agent_id.as_ref().and_then(target_id),
            content,
            new_mood,
            affinity_change: raw.affinity_change.as_ref().and_then(affinity),
        })
    }

    /// Used when the provider fails or answers with garbage.
    pub fn fallback(provider: &str) -> Self {
        Self {
            action_type: ActionType::Think,
            target_agent_id: None,
            content: format!(
                "Интересно, почему я чувствую пустоту в мыслях... ({provider} недоступен)"
            ),
            new_mood: Some(Mood::Curious),
            affinity_change: Some(0),
        }
    }

    pub fn is_talk(&self) -> bool {
        self.action_type == ActionType::Talk
    }
}

fn target_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn affinity(value: &Value) -> Option<i32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_start_matches('+').parse::<f64>().ok()?,
        _ => return None,
    };
    number
        .is_finite()
        .then(|| number.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
}

/// Slice from the first `{` to the last `}`
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Structured-output schema sent to providers that support one (Gemini).
pub fn response_schema() -> Value {
    let actions: Vec<&str> = ActionType::ALL.iter().map(|a| a.as_str()).collect();
    let moods: Vec<&str> = Mood::ALL.iter().map(|m| m.label()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "actionType": { "type": "STRING", "enum": actions },
            "targetAgentId": { "type": "STRING", "nullable": true },
            "content": { "type": "STRING" },
            "newMood": { "type": "STRING", "enum": moods },
            "affinityChange": { "type": "INTEGER", "nullable": true }
        },
        "required": ["actionType", "content", "newMood"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_talk() {
        let action = AgentAction::parse(
            r#"{"actionType":"TALK","targetAgentId":"agent-2","content":"Привет, Мария!","newMood":"Счастье","affinityChange":3}"#,
        )
        .expect("parse");

        assert_eq!(action.action_type, ActionType::Talk);
        assert_eq!(action.target_agent_id.as_deref(), Some("agent-2"));
        assert_eq!(action.content, "Привет, Мария!");
        assert_eq!(action.new_mood, Some(Mood::Happy));
        assert_eq!(action.affinity_change, Some(3));
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Конечно!\n```json\n{\"actionType\":\"work\",\"content\":\"Чиню реактор\",\"newMood\":\"Усталость\"}\n```";
        let action = AgentAction::parse(reply).expect("parse");

        assert_eq!(action.action_type, ActionType::Work);
        assert_eq!(action.new_mood, Some(Mood::Tired));
        assert_eq!(action.target_agent_id, None);
        assert_eq!(action.affinity_change, None);
    }

    #[rstest]
    #[case(r#""null""#, None)]
    #[case("null", None)]
    #[case(r#""""#, None)]
    #[case(r#"" agent-3 ""#, Some("agent-3"))]
    fn test_target_id_normalization(#[case] raw: &str, #[case] expected: Option<&str>) {
        let reply = format!(
            r#"{{"actionType":"TALK","targetAgentId":{raw},"content":"x","newMood":"Грусть"}}"#
        );
        let action = AgentAction::parse(&reply).expect("parse");
        assert_eq!(action.target_agent_id.as_deref(), expected);
    }

    #[rstest]
    #[case("2", Some(2))]
    #[case("-4.6", Some(-5))]
    #[case(r#""+3""#, Some(3))]
    #[case(r#""много""#, None)]
    #[case("null", None)]
    fn test_affinity_change_forms(#[case] raw: &str, #[case] expected: Option<i32>) {
        let reply = format!(
            r#"{{"actionType":"TALK","content":"x","newMood":"Злость","affinityChange":{raw}}}"#
        );
        let action = AgentAction::parse(&reply).expect("parse");
        assert_eq!(action.affinity_change, expected);
    }

    #[rstest]
    #[case("no json here")]
    #[case(r#"{"content":"x","newMood":"Грусть"}"#)]
    #[case(r#"{"actionType":"DANCE","content":"x","newMood":"Грусть"}"#)]
    #[case(r#"{"actionType":"THINK","content":"  ","newMood":"Грусть"}"#)]
    #[case(r#"{"actionType":"THINK","content":"x"}"#)]
    #[case(r#"{"actionType":"THINK","content":"x","newMood":"Грусть""#)]
    fn test_rejects_invalid_replies(#[case] reply: &str) {
        assert!(matches!(
            AgentAction::parse(reply),
            Err(SimError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_unknown_mood_is_tolerated() {
        let action = AgentAction::parse(
            r#"{"actionType":"REST","content":"Сплю","newMood":"Ностальгия"}"#,
        )
        .expect("parse");
        assert_eq!(action.new_mood, None);
    }

    #[test]
    fn test_fallback() {
        let action = AgentAction::fallback("ollama");
        assert_eq!(action.action_type, ActionType::Think);
        assert_eq!(action.new_mood, Some(Mood::Curious));
        assert!(action.content.contains("(ollama недоступен)"));
    }

    #[test]
    fn test_response_schema_lists_enums() {
        let schema = response_schema();
        assert_eq!(schema["properties"]["actionType"]["enum"][0], "TALK");
        assert_eq!(schema["properties"]["newMood"]["enum"][3], "Спокойствие");
        assert_eq!(schema["required"].as_array().map(Vec::len), Some(3));
    }
}
