use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub cors: Option<CorsConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub recordings: RecordingsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// Defaults to the platform data directory when unset.
    pub path: Option<PathBuf>,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: 8,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DispatchConfig {
    /// How many candidates a tier fetches before attempting claims.
    pub candidate_batch: usize,
    /// Re-reads of a tier after every candidate in a batch was lost to
    /// another agent.
    pub max_claim_rounds: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            candidate_batch: 16,
            max_claim_rounds: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordingsConfig {
    /// Root of the recording store. Defaults to `<data dir>/leadline/recordings`.
    pub root_dir: Option<PathBuf>,
    /// Directory, relative to the root, that treated recordings move into.
    pub treated_dir: String,
    pub max_component_len: usize,
}

impl Default for RecordingsConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            treated_dir: "treated".to_string(),
            max_component_len: 24,
        }
    }
}

impl ApiConfig {
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        // Create default config file if it doesn't exist
        if !config_path.exists() {
            let default_config = toml::to_string_pretty(&ApiConfig::default()).map_err(|e| {
                ConfigError::Message(format!("Failed to render default config: {e}"))
            })?;
            std::fs::write(&config_path, default_config).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let config = Self::from_sources(File::from(config_path.clone()))?;

        Ok((config, config_path))
    }

    fn from_sources(
        file: File<config::FileSourceFile, config::FileFormat>,
    ) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("LEADLINE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("leadline").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9000

[dispatch]
candidate_batch = 4
max_claim_rounds = 1
"#,
        )
        .unwrap();

        let config = ApiConfig::from_sources(File::from(path)).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dispatch.candidate_batch, 4);
        assert_eq!(config.database.pool_size, 8);
        assert_eq!(config.recordings.treated_dir, "treated");
        assert!(config.cors.is_none());
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&ApiConfig::default()).unwrap();
        assert!(rendered.contains("[server]"));
        assert!(rendered.contains("candidate_batch = 16"));
    }
}
