//! Agent moods.
//!
//! The serialized form is the Russian label the model sees in the prompt and
//! is asked to answer with.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[serde(rename = "Счастье")]
    Happy,
    #[serde(rename = "Грусть")]
    Sad,
    #[serde(rename = "Злость")]
    Angry,
    #[default]
    #[serde(rename = "Спокойствие")]
    Neutral,
    #[serde(rename = "Волнение")]
    Excited,
    #[serde(rename = "Усталость")]
    Tired,
    #[serde(rename = "Любопытство")]
    Curious,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Neutral,
        Mood::Excited,
        Mood::Tired,
        Mood::Curious,
    ];

    /// Label used in prompts and model replies
    pub fn label(self) -> &'static str {
        match self {
            Mood::Happy => "Счастье",
            Mood::Sad => "Грусть",
            Mood::Angry => "Злость",
            Mood::Neutral => "Спокойствие",
            Mood::Excited => "Волнение",
            Mood::Tired => "Усталость",
            Mood::Curious => "Любопытство",
        }
    }

    fn english(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Neutral => "neutral",
            Mood::Excited => "excited",
            Mood::Tired => "tired",
            Mood::Curious => "curious",
        }
    }

    /// Hex color used by the terminal UI and graph export
    pub fn color(self) -> &'static str {
        match self {
            Mood::Happy => "#4ade80",
            Mood::Sad => "#60a5fa",
            Mood::Angry => "#f87171",
            Mood::Neutral => "#94a3b8",
            Mood::Excited => "#facc15",
            Mood::Tired => "#a8a29e",
            Mood::Curious => "#c084fc",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        let hex = &self.color()[1..];
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0x94);
        (channel(0), channel(2), channel(4))
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Sad => "😢",
            Mood::Angry => "😠",
            Mood::Neutral => "😐",
            Mood::Excited => "🤩",
            Mood::Tired => "😴",
            Mood::Curious => "🧐",
        }
    }

    /// Accepts the Russian label or the English name, ignoring case.
    pub fn parse(text: &str) -> Option<Mood> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        Mood::ALL
            .into_iter()
            .find(|m| m.label().to_lowercase() == needle || m.english() == needle)
    }

    /// Comma separated list for prompts
    pub fn catalogue() -> String {
        Mood::ALL
            .iter()
            .map(|m| m.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(Mood::parse("Счастье"), Some(Mood::Happy));
        assert_eq!(Mood::parse("  любопытство "), Some(Mood::Curious));
        assert_eq!(Mood::parse("TIRED"), Some(Mood::Tired));
        assert_eq!(Mood::parse("melancholy"), None);
        assert_eq!(Mood::parse(""), None);
    }

    #[test]
    fn test_serde_uses_russian_label() {
        let json = serde_json::to_string(&Mood::Angry).expect("serialize");
        assert_eq!(json, "\"Злость\"");

        let mood: Mood = serde_json::from_str("\"Волнение\"").expect("deserialize");
        assert_eq!(mood, Mood::Excited);
    }

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Mood::Happy.rgb(), (0x4a, 0xde, 0x80));
        assert_eq!(Mood::Neutral.rgb(), (0x94, 0xa3, 0xb8));
    }

    #[test]
    fn test_catalogue_lists_every_mood() {
        let catalogue = Mood::catalogue();
        for mood in Mood::ALL {
            assert!(catalogue.contains(mood.label()));
        }
    }
}
