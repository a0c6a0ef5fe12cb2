//! Server configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! command-line flags or their environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// TCP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory holding users.json and notes.json (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory for uploaded attachments (supports ~ expansion)
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Optional directory of static frontend files served at `/`
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Origins allowed by CORS (empty = any origin)
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_port() -> u16 {
    5000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_data_dir() -> String {
    "db".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            data_dir: default_data_dir(),
            upload_dir: default_upload_dir(),
            static_dir: None,
            allowed_origins: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file; missing keys take their defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    pub fn resolve_upload_dir(&self) -> PathBuf {
        expand_home(&self.upload_dir)
    }

    pub fn resolve_static_dir(&self) -> Option<PathBuf> {
        self.static_dir.as_deref().map(expand_home)
    }
}

/// Command-line and environment overrides for `ServerConfig`
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServerOverrides {
    #[arg(long, env = "PORT", help = "Port to listen on")]
    pub port: Option<u16>,

    #[arg(long, env = "CLOUDNOTES_BIND", help = "Address to bind")]
    pub bind: Option<String>,

    #[arg(long, env = "CLOUDNOTES_DATA_DIR", help = "Directory for JSON collections")]
    pub data_dir: Option<String>,

    #[arg(long, env = "CLOUDNOTES_UPLOAD_DIR", help = "Directory for attachments")]
    pub upload_dir: Option<String>,

    #[arg(long, env = "CLOUDNOTES_STATIC_DIR", help = "Serve a static frontend from this directory")]
    pub static_dir: Option<String>,

    #[arg(
        long,
        env = "CLOUDNOTES_ALLOWED_ORIGINS",
        value_delimiter = ',',
        help = "Comma-separated CORS origins"
    )]
    pub allowed_origins: Vec<String>,
}

impl ServerOverrides {
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.upload_dir {
            config.upload_dir = dir;
        }
        if self.static_dir.is_some() {
            config.static_dir = self.static_dir;
        }
        let origins: Vec<String> = self
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if !origins.is_empty() {
            config.allowed_origins = origins;
        }
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
