//! Application configuration: YAML file with environment overrides.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use relay_answer_stream::selectors::DEFAULT_TARGET_URL;
use relay_cdp_adapter::{config::DEFAULT_USER_AGENT, DriverConfig};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the HTTP facade listens on.
    pub listen_addr: String,
    /// Remote DevTools endpoint; unset launches a local browser.
    pub cdp_url: Option<String>,
    /// Default notebook address when a query names none.
    pub target_url: String,
    /// Default per-query streaming budget, seconds.
    pub default_timeout_secs: u64,
    pub headless: bool,
    pub user_data_dir: Option<PathBuf>,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            cdp_url: None,
            target_url: DEFAULT_TARGET_URL.to_string(),
            default_timeout_secs: 120,
            headless: false,
            user_data_dir: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl RelayConfig {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            endpoint: self.cdp_url.clone(),
            headless: self.headless,
            user_data_dir: self.user_data_dir.clone(),
            user_agent: Some(self.user_agent.clone()),
            window_width: self.window_width,
            window_height: self.window_height,
        }
    }
}

/// Load configuration from a YAML file (explicit path, or the default
/// under the user config directory), then apply environment overrides.
pub async fn load_config(config_path: Option<&PathBuf>) -> Result<RelayConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            let mut path = dirs::config_dir().context("failed to get config directory")?;
            path.push("notebook-relay");
            path.push("config.yaml");
            path
        }
    };

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("failed to read config file")?;
        let config: RelayConfig =
            serde_yaml::from_str(&content).context("failed to parse config file")?;
        info!("loaded configuration from {}", config_path.display());
        config
    } else {
        warn!(
            "config file not found, using defaults: {}",
            config_path.display()
        );
        RelayConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut RelayConfig) {
    if let Ok(value) = std::env::var("RELAY_LISTEN_ADDR") {
        config.listen_addr = value;
    }
    if let Ok(value) = std::env::var("RELAY_CDP_URL") {
        if !value.is_empty() {
            config.cdp_url = Some(value);
        }
    }
    if let Ok(value) = std::env::var("RELAY_TARGET_URL") {
        config.target_url = value;
    }
    if let Ok(value) = std::env::var("RELAY_USER_AGENT") {
        config.user_agent = value;
    }
    if let Ok(value) = std::env::var("RELAY_HEADLESS") {
        match value.parse::<bool>() {
            Ok(headless) => config.headless = headless,
            Err(_) => warn!("ignoring non-boolean RELAY_HEADLESS value: {value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_notebook_ui() {
        let config = RelayConfig::default();
        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.default_timeout_secs, 120);
        assert!(config.cdp_url.is_none());
    }

    #[test]
    fn driver_config_mirrors_relay_settings() {
        let config = RelayConfig {
            cdp_url: Some("http://selenium-host:9222".into()),
            headless: true,
            ..RelayConfig::default()
        };
        let driver = config.driver_config();
        assert_eq!(driver.endpoint.as_deref(), Some("http://selenium-host:9222"));
        assert!(driver.headless);
        assert_eq!(driver.window_width, 1920);
    }

    #[test]
    fn yaml_round_trip_preserves_fields() {
        let config = RelayConfig::default();
        let text = serde_yaml::to_string(&config).unwrap();
        let back: RelayConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.listen_addr, config.listen_addr);
        assert_eq!(back.target_url, config.target_url);
    }
}
