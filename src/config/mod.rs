mod file_config;

pub use file_config::{FileConfig, LlmConfig};

use anyhow::Result;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub session_ttl_minutes: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            port: 5000,
            session_ttl_minutes: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub session_ttl_minutes: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub llm: LlmSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from("./data"));

        let port = file.port.unwrap_or(cli.port);
        let session_ttl_minutes = file.session_ttl_minutes.unwrap_or(cli.session_ttl_minutes);

        let ffmpeg_path = file.ffmpeg_path.unwrap_or_else(|| "ffmpeg".to_string());
        let ffprobe_path = file.ffprobe_path.unwrap_or_else(|| "ffprobe".to_string());

        let llm_file = file.llm.unwrap_or_default();
        let llm_defaults = LlmSettings::default();
        let llm = LlmSettings {
            base_url: llm_file.base_url.unwrap_or(llm_defaults.base_url),
            model: llm_file.model.unwrap_or(llm_defaults.model),
            api_key: llm_file
                .api_key
                .or_else(|| std::env::var("HF_API_KEY").ok()),
            timeout_secs: llm_file.timeout_secs.unwrap_or(llm_defaults.timeout_secs),
        };

        Ok(Self {
            data_dir,
            port,
            session_ttl_minutes,
            ffmpeg_path,
            ffprobe_path,
            llm,
        })
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn conversations_db_path(&self) -> PathBuf {
        self.data_dir.join("conversations.db")
    }
}

/// Settings for the hosted text-generation backend.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co".to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}
