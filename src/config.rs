use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Optional user overrides for directories and fusion defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound(PathBuf),
    InvalidJson(String),
    IoError(std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => write!(f, "Config file not found: {}", path.display()),
            ConfigError::InvalidJson(msg) => write!(f, "Invalid JSON in config: {}", msg),
            ConfigError::IoError(e) => write!(f, "IO error reading config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config").join("cmdfuse.json"))
}

pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path()
        .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config/cmdfuse.json")))?;

    if !path.exists() {
        return Err(ConfigError::NotFound(path));
    }

    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|e| ConfigError::InvalidJson(e.to_string()))
}

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cmdfuse")
}

impl Config {
    /// Where deployed packages live.
    pub fn package_dir(&self) -> PathBuf {
        self.package_dir
            .clone()
            .unwrap_or_else(|| base_dir().join("packages"))
    }

    /// Where fused command files are saved.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| base_dir().join("fused"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_config() {
        let json = r#"{
            "package_dir": "/tmp/packages",
            "command_column": "Commands",
            "strategy": "group"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.package_dir, Some(PathBuf::from("/tmp/packages")));
        assert_eq!(config.command_column, Some("Commands".to_string()));
        assert_eq!(config.strategy, Some("group".to_string()));
        assert_eq!(config.id_separator, None);
    }

    #[test]
    fn deserialize_empty_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.package_dir, None);
        assert_eq!(config.output_dir, None);
    }

    #[test]
    fn package_dir_falls_back_to_default() {
        let config = Config::default();
        assert!(config.package_dir().ends_with(".cmdfuse/packages"));
        assert!(config.output_dir().ends_with(".cmdfuse/fused"));
    }

    #[test]
    fn explicit_dirs_win_over_defaults() {
        let config = Config {
            package_dir: Some(PathBuf::from("/srv/packages")),
            output_dir: Some(PathBuf::from("/srv/out")),
            ..Config::default()
        };
        assert_eq!(config.package_dir(), PathBuf::from("/srv/packages"));
        assert_eq!(config.output_dir(), PathBuf::from("/srv/out"));
    }
}
