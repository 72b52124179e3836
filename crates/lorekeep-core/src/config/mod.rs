//! Configuration management with file persistence

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Lorekeep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    /// Defaults to a local Ollama instance.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

/// Which graph store backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    /// In-process multigraph with JSON snapshot persistence
    Embedded,
    /// Transactional SQLite store
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub backend: GraphBackend,
    /// Directory holding the snapshot file or database file.
    /// Defaults to the data dir when empty.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum triples requested from the extraction service per document
    pub max_triples: usize,
    /// Maximum entity-resolution candidates offered to disambiguation
    pub candidate_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: "http://localhost:11434/v1".to_string(),
                model: "phi3".to_string(),
                temperature: 0.0,
                max_tokens: 1024,
                timeout_secs: 120,
            },
            graph: GraphConfig {
                backend: GraphBackend::Embedded,
                data_dir: None,
            },
            ingest: IngestConfig {
                max_triples: 10,
                candidate_limit: 5,
            },
        }
    }
}

impl LlmConfig {
    /// API keys are only ever read from the environment, never from disk.
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("LOREKEEP_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok())
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| {
            opt.map(|key| {
                if key.len() <= 4 {
                    "***".to_string()
                } else {
                    let suffix = &key[key.len() - 4..];
                    format!("***{}", suffix)
                }
            })
        })
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl GraphConfig {
    /// Resolve the directory holding graph data, creating it if needed
    pub fn resolved_data_dir(&self) -> anyhow::Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .ok_or_else(|| anyhow!("Could not determine data directory"))?
                .join("lorekeep"),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        }
        Ok(dir)
    }

    /// Path of the embedded store's JSON snapshot
    pub fn snapshot_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.resolved_data_dir()?.join("graph.json"))
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.resolved_data_dir()?.join("graph.db"))
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("LOREKEEP_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("lorekeep")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.llm.enforce_env_only()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        let dir = Self::config_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(Self::config_path()?, contents).context("Failed to write config file")?;
        Ok(())
    }
}
