//! Configuration system for the `tazq-identity` server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tazq-identity/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use tazq_proto::identity::MIN_PASSWORD_LENGTH;

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct IdentityConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    min_password_len: Option<usize>,
    log_level: Option<String>,
}

/// CLI arguments for the identity server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Tazq identity provider and profile store")]
pub struct IdentityCliArgs {
    /// Address to bind the server to.
    #[arg(short, long, env = "TAZQ_IDENTITY_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/tazq-identity/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Shortest password accepted on sign-up.
    #[arg(long)]
    pub min_password_len: Option<usize>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, env = "TAZQ_IDENTITY_LOG")]
    pub log_level: Option<String>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Address to bind the server to (e.g., `127.0.0.1:9400`).
    pub bind_addr: String,
    /// Shortest password accepted on sign-up, in characters.
    pub min_password_len: usize,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9400".to_string(),
            min_password_len: MIN_PASSWORD_LENGTH,
            log_level: "info".to_string(),
        }
    }
}

impl IdentityConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or any config file cannot be parsed.
    pub fn load(cli: &IdentityCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, file))
    }

    fn resolve(cli: &IdentityCliArgs, file: IdentityConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            min_password_len: cli
                .min_password_len
                .or(file.server.min_password_len)
                .unwrap_or(defaults.min_password_len),
            log_level: cli
                .log_level
                .clone()
                .or(file.server.log_level)
                .unwrap_or(defaults.log_level),
        }
    }
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<IdentityConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(IdentityConfigFile::default());
    };
    let path = config_dir.join("tazq-identity").join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IdentityConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
