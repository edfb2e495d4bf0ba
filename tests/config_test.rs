//! Config and roster files on disk.

use std::fs;

use tempfile::TempDir;

use simulacrum::config::{load_config, save_config, SimConfig};
use simulacrum::world::{Mood, Roster};
use simulacrum::SimError;

const ROSTER: &str = r#"
[[agents]]
id = "cap"
name = "Капитан"
role = "Командир"
personality = "Строгий"
mood = "Злость"
mood_intensity = 80
memories = ["Корабль сел на мель."]
current_action = "Смотрит на горизонт"

[[agents]]
id = "cook"
name = "Кок"
role = "Повар"
personality = "Добрый"
"#;

// ==================== Config Tests ====================

#[test]
fn test_json_config_with_custom_roster() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let roster_path = dir.path().join("crew.toml");
    fs::write(&roster_path, ROSTER).expect("write roster");

    let config_path = dir.path().join("sim.json");
    let json = serde_json::json!({
        "provider": "ollama",
        "speed": 5,
        "global_context": "Шторм стих.",
        "roster": roster_path,
        "limits": { "memory_limit": 3 }
    });
    fs::write(&config_path, json.to_string()).expect("write config");

    let config = load_config(Some(&config_path)).expect("load");
    assert_eq!(config.speed, 5);
    assert_eq!(config.limits.memory_limit, 3);
    assert_eq!(config.limits.journal_limit, 100);

    let registry = config.registry();
    let sim = config.simulation(&registry).expect("simulation");
    assert_eq!(sim.speed(), 5);
    assert_eq!(sim.decider().provider_name(), "ollama");

    sim.with_world(|world| {
        assert_eq!(world.global_context(), "Шторм стих.");
        let captain = world.find_agent("капитан").expect("found by name");
        assert_eq!(captain.id, "cap");
        assert_eq!(captain.mood, Mood::Angry);
        assert_eq!(captain.mood_intensity, 80);

        let cook = world.agent("cook").expect("cook");
        assert_eq!(cook.mood, Mood::Neutral);
        assert_eq!(cook.mood_intensity, 50);
    });
}

#[test]
fn test_toml_roundtrip_through_disk() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");

    let mut config = SimConfig::default();
    config.model = Some("mistral".to_string());
    config.limits.graph_threshold = 25;
    save_config(&config, &path).expect("save");

    let text = fs::read_to_string(&path).expect("read");
    assert!(text.contains("model = \"mistral\""));

    let loaded = load_config(Some(&path)).expect("load");
    assert_eq!(loaded.limits.graph_threshold, 25);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "speed = \"fast\"").expect("write");

    assert!(matches!(
        load_config(Some(&path)),
        Err(SimError::ConfigurationError(_))
    ));
}

// ==================== Roster Tests ====================

#[test]
fn test_builtin_roster_survives_toml() {
    let text = Roster::builtin().to_toml().expect("toml");
    let parsed = Roster::from_toml(&text).expect("parse");
    assert_eq!(parsed, Roster::builtin());
}

#[test]
fn test_roster_rejects_duplicates_and_missing_file() {
    let duplicated = format!("{ROSTER}\n[[agents]]\nid = \"cap\"\nname = \"X\"\nrole = \"Y\"\npersonality = \"Z\"\n");
    assert!(Roster::from_toml(&duplicated).is_err());

    let dir = TempDir::new().expect("Failed to create temp dir");
    assert!(matches!(
        Roster::load(&dir.path().join("nope.toml")),
        Err(SimError::FileAccessError { .. })
    ));
}
