use igloo_connector::IsolationLevel;
use igloo_connector_memory::MemoryConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub node_id: String,
    pub node_address: String,
    pub system_connector_id: String,
    /// Route system tables through the generic metadata/split/page path so
    /// they can be joined with other catalogs.
    pub expose_system_tables: bool,
    pub default_isolation_level: IsolationLevel,
    pub memory: MemorySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_id: "coordinator-1".to_string(),
            node_address: "http://127.0.0.1:8080".to_string(),
            system_connector_id: "system".to_string(),
            expose_system_tables: false,
            default_isolation_level: IsolationLevel::ReadCommitted,
            memory: MemorySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub connector_id: String,
    pub rows_per_split: usize,
    pub rows_per_page: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        let config = MemoryConfig::default();
        Self {
            connector_id: "memory".to_string(),
            rows_per_split: config.rows_per_split,
            rows_per_page: config.rows_per_page,
        }
    }
}

impl MemorySettings {
    pub fn connector_config(&self) -> MemoryConfig {
        MemoryConfig {
            rows_per_split: self.rows_per_split,
            rows_per_page: self.rows_per_page,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let config_file_path = std::env::var("IGLOO_CONFIG_PATH")
            .unwrap_or_else(|_| "crates/coordinator/config/default.toml".to_string());

        let s = config::Config::builder()
            .add_source(config::File::with_name(&config_file_path).required(true))
            .add_source(
                config::Environment::with_prefix("IGLOO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
