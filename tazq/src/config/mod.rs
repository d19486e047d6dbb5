//! Configuration for the `tazq` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tazq/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};

use tazq_proto::task::{DEFAULT_CATEGORIES, Priority, TaskId};

use crate::tasks::SortOption;

/// Identity service address used when nothing else is configured.
pub const DEFAULT_IDENTITY_URL: &str = "http://127.0.0.1:9400";

/// Errors that can occur when loading configuration.
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

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    identity: IdentityFileConfig,
    tasks: TasksFileConfig,
}

/// `[storage]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    database_path: Option<PathBuf>,
}

/// `[identity]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct IdentityFileConfig {
    url: Option<String>,
    session_file: Option<PathBuf>,
}

/// `[tasks]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TasksFileConfig {
    categories: Option<Vec<String>>,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// SQLite database holding the task table.
    pub database_path: PathBuf,
    /// Base URL of the `tazq-identity` service.
    pub identity_url: String,
    /// Where the signed-in session is cached between runs.
    pub session_file: PathBuf,
    /// Known task categories, in display order.
    pub categories: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tazq");
        Self {
            database_path: data_dir.join("tazq.db"),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            session_file: data_dir.join("session.json"),
            categories: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or if any config file cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            database_path: cli
                .database
                .clone()
                .or(file.storage.database_path)
                .unwrap_or(defaults.database_path),
            identity_url: cli
                .identity_url
                .clone()
                .or(file.identity.url)
                .unwrap_or(defaults.identity_url),
            session_file: file.identity.session_file.unwrap_or(defaults.session_file),
            categories: file
                .tasks
                .categories
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.categories),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task manager with local storage and remote sign-in")]
pub struct CliArgs {
    /// Path to the task database.
    #[arg(long, env = "TAZQ_DATABASE")]
    pub database: Option<PathBuf>,

    /// Base URL of the identity service.
    #[arg(long, env = "TAZQ_IDENTITY_URL")]
    pub identity_url: Option<String>,

    /// Path to config file (default: `~/.config/tazq/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TAZQ_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/tazq.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do. Without a subcommand the task list is printed.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and sign in.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TAZQ_PASSWORD")]
        password: String,
    },
    /// Sign in to an existing account.
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TAZQ_PASSWORD")]
        password: String,
    },
    /// Forget the cached session.
    Signout,
    /// Show the signed-in user.
    Whoami,
    /// Add a task.
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List tasks.
    List {
        /// Only tasks whose title or description contains this text.
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        sort: Option<SortOption>,
    },
    /// Flip a task between done and not done.
    Toggle { id: TaskId },
    /// Change fields of a task.
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a task.
    Delete { id: TaskId },
    /// Task count per category.
    Categories,
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("tazq").join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
