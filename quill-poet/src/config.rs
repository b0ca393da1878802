use anyhow::Context;
use clap::Parser;
use quill_bridge::ListenConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "quill-poet", about = "Poet agent that asks a human for words")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/poet.toml")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PoetConfig {
    pub server: ListenConfig,
    pub llm: LlmConfig,
    pub harness: HarnessConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
            model: "gemini-1.5-flash".into(),
            temperature: 0.1,
            timeout_secs: 120,
            api_key_env: "GOOGLE_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub warmup_secs: u64,
    pub answer_timeout_secs: u64,
    pub wait_for_client: bool,
    /// Open the answer page in the default browser once the server is up
    pub open_browser: bool,
    pub max_iterations: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            warmup_secs: 5,
            answer_timeout_secs: 180,
            wait_for_client: true,
            open_browser: true,
            max_iterations: 20,
        }
    }
}

impl HarnessConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_secs(self.answer_timeout_secs)
    }
}

impl PoetConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn api_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.llm.api_key_env)
            .with_context(|| format!("{} is not set", self.llm.api_key_env))
    }
}
