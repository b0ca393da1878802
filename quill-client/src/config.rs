use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quill", about = "Answer quill agent questions from the terminal")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/client.toml")]
    pub config: PathBuf,

    /// Override the websocket URL from the config file
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerAddr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerAddr {
    pub url: String,
}

impl Default for ServerAddr {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".into(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
