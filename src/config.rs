//! Engine configuration stored in `~/.dealboard/config.json`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::store::http::HttpStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the remote store.
    pub store_url: String,
    pub api_key: String,
    /// Delay before refetching after a next-step dialog completes.
    #[serde(default = "default_next_step_refresh_delay_ms")]
    pub next_step_refresh_delay_ms: u64,
}

fn default_next_step_refresh_delay_ms() -> u64 {
    crate::transition::NEXT_STEP_REFRESH_DELAY_MS
}

impl Config {
    /// Build the remote store client this config points at.
    pub fn open_store(&self) -> EngineResult<HttpStore> {
        HttpStore::new(&self.store_url, &self.api_key)
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}

pub fn load_config() -> EngineResult<Config> {
    let home = dirs::home_dir()
        .ok_or_else(|| EngineError::Config("Could not find home directory".to_string()))?;
    let config_path = home.join(".dealboard").join("config.json");

    if !config_path.exists() {
        return Err(EngineError::Config(format!(
            "Config file not found at {}. Create it with: {{ \"storeUrl\": \"https://...\", \"apiKey\": \"...\" }}",
            config_path.display()
        )));
    }

    load_config_from(&config_path)
}

pub fn load_config_from(path: &Path) -> EngineResult<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("Failed to read config: {}", e)))?;

    serde_json::from_str(&content)
        .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
}
