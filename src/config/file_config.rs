//! TOML file configuration.
//!
//! Every field is optional; missing values fall back to CLI arguments and
//! then to built-in defaults during [`AppConfig::resolve`](super::AppConfig::resolve).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub data_dir: Option<String>,
    pub port: Option<u16>,
    pub session_ttl_minutes: Option<u64>,
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            data_dir = "/var/lib/engnr"
            port = 8080
            session_ttl_minutes = 15

            [llm]
            model = "mistralai/Mistral-7B-Instruct-v0.2"
            api_key = "hf_secret"
            timeout_secs = 60
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("/var/lib/engnr"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.session_ttl_minutes, Some(15));
        let llm = config.llm.unwrap();
        assert_eq!(
            llm.model.as_deref(),
            Some("mistralai/Mistral-7B-Instruct-v0.2")
        );
        assert_eq!(llm.timeout_secs, Some(60));
        assert!(llm.base_url.is_none());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.data_dir.is_none());
        assert!(config.llm.is_none());
    }
}
