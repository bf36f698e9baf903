use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnotationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Service credential. When absent, `ANNOTATION_API_KEY` is consulted
    /// once at client construction; the constructed client holds whatever
    /// was found.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_annotation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_annotation_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://vision.googleapis.com/v1/images:annotate".to_string()
}
fn default_annotation_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationConfig {
    /// Wall-clock budget per candidate URL, covering HEAD and GET combined.
    #[serde(default = "default_validation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_validation_timeout_secs(),
        }
    }
}

fn default_validation_timeout_secs() -> u64 {
    6
}

impl AnnotationConfig {
    /// Resolve the credential: explicit config first, environment second.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANNOTATION_API_KEY").ok())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.annotation.endpoint.is_empty() {
        anyhow::bail!("annotation.endpoint must not be empty");
    }
    if config.annotation.timeout_secs == 0 {
        anyhow::bail!("annotation.timeout_secs must be > 0");
    }
    if config.validation.timeout_secs == 0 {
        anyhow::bail!("validation.timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str("[db]\npath = \"data/replica.sqlite\"\n").unwrap();
        assert_eq!(config.validation.timeout_secs, 6);
        assert_eq!(config.annotation.timeout_secs, 30);
        assert!(config.annotation.api_key.is_none());
        assert!(config.annotation.endpoint.contains("images:annotate"));
    }

    #[test]
    fn explicit_api_key_wins_over_environment() {
        let config = AnnotationConfig {
            api_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-config"));
    }
}
