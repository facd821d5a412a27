use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::core::error::PotcheckError;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Timeout for banner grabs and single HTTP fetches.
    pub banner_timeout_secs: u64,
    pub http_timeout_secs: u64,
    /// Timeout for multi-step protocol probes.
    pub probe_timeout_secs: u64,
    pub user_agent: String,
    /// Reference literary text the Glastopf content check compares against.
    pub reference_text_url: String,
}

impl AppConfig {
    pub fn banner_timeout(&self) -> Duration {
        Duration::from_secs(self.banner_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

pub fn load_config(path: Option<&str>) -> Result<AppConfig, PotcheckError> {
    let default_path = Path::new("config/potcheck.toml");
    let path = path.map(Path::new).unwrap_or(default_path);

    if !path.exists() {
        return Ok(default_config());
    }

    let content = fs::read_to_string(path).map_err(|e| PotcheckError::Config(e.to_string()))?;
    let cfg: AppConfig =
        toml::from_str(&content).map_err(|e| PotcheckError::Config(e.to_string()))?;
    Ok(cfg)
}

fn default_config() -> AppConfig {
    AppConfig {
        banner_timeout_secs: 5,
        http_timeout_secs: 5,
        probe_timeout_secs: 10,
        user_agent: "potcheck/1.0".to_string(),
        reference_text_url: "http://www.gutenberg.org/files/42671/42671.txt".to_string(),
    }
}
