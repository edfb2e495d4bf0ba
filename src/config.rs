//! Simulation Configuration
//!
//! Gerencia configuração persistente da simulação.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::brain::ActionDecider;
use crate::errors::{Result, SimError};
use crate::providers::{
    create_registry, OllamaConfig, ProviderRegistry, ProvidersConfig, DEFAULT_TIMEOUT_SECS,
};
use crate::sim::{Simulation, MAX_SPEED, MIN_SPEED};
use crate::world::state::DEFAULT_GLOBAL_CONTEXT;
use crate::world::{Roster, World, WorldLimits};

/// Configuração da simulação
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Provider que decide as ações (ollama, openai, gemini)
    pub provider: String,

    /// Modelo; `None` usa o padrão do provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Temperatura (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max tokens da resposta
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Timeout das requisições em segundos
    pub request_timeout_secs: u64,

    /// Velocidade inicial (1x - 10x)
    pub speed: u8,

    /// Contexto global inicial
    pub global_context: String,

    /// Arquivo TOML com o elenco; `None` usa o elenco embutido
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<PathBuf>,

    /// Limites de memória, log e grafo
    pub limits: WorldLimits,

    /// Configuração dos providers
    pub providers: ProvidersConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            temperature: Some(0.8),
            max_tokens: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            speed: MIN_SPEED,
            global_context: DEFAULT_GLOBAL_CONTEXT.to_string(),
            roster: None,
            limits: WorldLimits::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl SimConfig {
    /// Diretório de configuração
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "simulacrum", "simulacrum")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Caminho do arquivo de config
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Parse por extensão: `.json` é JSON, o resto é TOML
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(content)
                .map_err(|e| SimError::ConfigurationError(format!("Invalid JSON config: {e}")))
        } else {
            toml::from_str(content)
                .map_err(|e| SimError::ConfigurationError(format!("Invalid TOML config: {e}")))
        }
    }

    /// Aplica variáveis de ambiente por cima do arquivo
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = var("SIMULACRUM_PROVIDER") {
            self.provider = provider.trim().to_lowercase();
        }
        if let Some(model) = var("SIMULACRUM_MODEL") {
            self.model = Some(model.trim().to_string());
        }

        let ollama_url = var("OLLAMA_BASE_URL");
        let ollama_model = var("OLLAMA_MODEL");
        if ollama_url.is_some() || ollama_model.is_some() {
            let ollama = self.providers.ollama.get_or_insert_with(OllamaConfig::default);
            if ollama_url.is_some() {
                ollama.base_url = ollama_url;
            }
            if ollama_model.is_some() {
                ollama.default_model = ollama_model;
            }
        }
    }

    /// Normaliza valores fora da faixa
    pub fn validate(&mut self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(SimError::ConfigurationError(
                "provider must not be empty".to_string(),
            ));
        }
        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(SimError::ConfigurationError(format!(
                    "temperature must be within 0.0-2.0, got {temp}"
                )));
            }
        }
        if self.limits.memory_limit == 0 || self.limits.journal_limit == 0 {
            return Err(SimError::ConfigurationError(
                "memory_limit and journal_limit must be positive".to_string(),
            ));
        }
        self.speed = self.speed.clamp(MIN_SPEED, MAX_SPEED);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SimError::SerializationError(format!("Failed to serialize config: {e}")))
    }

    pub fn registry(&self) -> ProviderRegistry {
        create_registry(&self.providers, self.request_timeout_secs)
    }

    /// Roster file if configured, built-in cast otherwise
    pub fn world(&self) -> Result<World> {
        let roster = match &self.roster {
            Some(path) => Roster::load(path)?,
            None => Roster::builtin(),
        };
        Ok(World::new(roster.into_agents(), self.limits)
            .with_global_context(self.global_context.clone()))
    }

    /// Fails when the selected provider is not registered (e.g. missing API key)
    pub fn decider(&self, registry: &ProviderRegistry) -> Result<ActionDecider> {
        let provider = registry.get(&self.provider).ok_or_else(|| {
            SimError::ConfigurationError(format!(
                "Provider '{}' is not available (registered: {}). Check its API key.",
                self.provider,
                registry.list().join(", ")
            ))
        })?;

        Ok(ActionDecider::new(provider)
            .with_model(self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens))
    }

    pub fn simulation(&self, registry: &ProviderRegistry) -> Result<Simulation> {
        let sim = Simulation::new(self.world()?, self.decider(registry)?);
        sim.set_speed(self.speed);
        Ok(sim)
    }
}

/// Carrega configuração.
///
/// Um caminho explícito precisa existir; o caminho padrão ausente resulta nos defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<SimConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => SimConfig::config_path().ok_or_else(|| {
            SimError::ConfigurationError("Could not determine config path".to_string())
        })?,
    };

    let mut config = if path.exists() {
        let content = fs::read_to_string(&path).map_err(|e| SimError::file_access(&path, e))?;
        tracing::debug!("Loaded config from {}", path.display());
        SimConfig::parse(&content, &path)?
    } else if explicit.is_some() {
        return Err(SimError::file_access(&path, "config file not found"));
    } else {
        SimConfig::default()
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Salva configuração no arquivo
pub fn save_config(config: &SimConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SimError::file_access(parent, e))?;
    }

    let content = if path.extension().is_some_and(|e| e == "json") {
        serde_json::to_string_pretty(config)?
    } else {
        config.to_toml()?
    };

    fs::write(path, content).map_err(|e| SimError::file_access(path, e))
}
