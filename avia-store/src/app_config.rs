use avia_core::AuthConfig;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Development mode: internal error messages reach the client.
    #[serde(default)]
    pub expose_internal_errors: bool,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Run against the in-memory store instead of Postgres.
    #[serde(default)]
    pub in_memory: bool,
}

fn default_max_connections() -> u32 {
    5
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &avia_shared::Masked(&self.url))
            .field("max_connections", &self.max_connections)
            .field("in_memory", &self.in_memory)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `AVIA__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("AVIA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
