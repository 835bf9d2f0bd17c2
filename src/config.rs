//! Configuration structures and loading logic.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device API key (bearer token).
    pub api_key: String,
    pub devices: Vec<Device>,
}

/// One physical display device and its scheduled cards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub name: String,
    pub device_id: String,
    pub schedules: Vec<Schedule>,
}

/// One scheduled render job: a cron expression (evaluated by an external
/// scheduler), a scenario name, and its parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub cron: String,
    /// Scenario name as registered in the view registry.
    #[serde(rename = "type")]
    pub view: String,
    #[serde(default)]
    pub params: Option<toml::Value>,
}

impl Schedule {
    /// Schedule parameters as the JSON value the registry consumes.
    pub fn params_json(&self) -> Result<serde_json::Value, ConfigError> {
        match &self.params {
            Some(value) => Ok(serde_json::to_value(value)?),
            None => Ok(serde_json::Value::Object(serde_json::Map::new())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot convert schedule params: {0}")]
    Params(#[from] serde_json::Error),
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
api_key = "secret"

[[devices]]
name = "desk"
device_id = "ABC123"

[[devices.schedules]]
cron = "*/30 * * * *"
type = "title_image"

[devices.schedules.params]
main_title = "Hello"
sub_title = "World"
"#;

    #[test]
    fn parses_devices_and_schedules() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.devices.len(), 1);
        let device = &config.devices[0];
        assert_eq!(device.device_id, "ABC123");
        assert_eq!(device.schedules.len(), 1);
        assert_eq!(device.schedules[0].view, "title_image");
    }

    #[test]
    fn schedule_params_become_json() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let params = config.devices[0].schedules[0].params_json().unwrap();
        assert_eq!(params["main_title"], "Hello");
        assert_eq!(params["sub_title"], "World");
    }

    #[test]
    fn missing_params_become_empty_object() {
        let schedule = Schedule { cron: String::new(), view: "text".to_owned(), params: None };
        let params = schedule.params_json().unwrap();
        assert!(params.as_object().unwrap().is_empty());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert!(parsed.devices.is_empty());
    }

    #[test]
    fn empty_config_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.api_key.is_empty());
        assert!(config.devices.is_empty());
    }
}
