use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for tocmatch.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (TOCM_* prefix)
/// 3. Config file (~/.config/tocmatch/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite tracklist catalog.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/catalog.db
    /// - ENV: TOCM_DATABASE_PATH
    /// - Config: database_path = "/path/to/catalog.db"
    /// - Default: ~/.local/share/tocmatch/catalog.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Address the lookup server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port the lookup server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Threads answering lookup requests.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Match distance used when a request does not pass `distance`.
    #[serde(default = "default_threshold_ms")]
    pub default_threshold_ms: u64,

    /// Rows fetched per catalog page while building.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Rebuild the index this often while serving. Unset means build once.
    #[serde(default)]
    pub rebuild_interval_secs: Option<u64>,

    /// Logger settings.
    #[serde(default)]
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            bind: default_bind(),
            port: default_port(),
            workers: default_workers(),
            default_threshold_ms: default_threshold_ms(),
            chunk_size: default_chunk_size(),
            rebuild_interval_secs: None,
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/tocmatch/config.toml
    /// Reads environment variables with TOCM_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new()
            .context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path.to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder.add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("tocm");
        builder.add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build()
            .context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// `bind:port` for the lookup server.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/tocmatch/catalog.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tocmatch")
        .join("catalog.db")
}

fn default_bind() -> String {
    String::from("127.0.0.1")
}

const fn default_port() -> u16 {
    8000
}

const fn default_workers() -> usize {
    4
}

const fn default_threshold_ms() -> u64 {
    5_000
}

const fn default_chunk_size() -> usize {
    2_000
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/tocmatch/config.toml
/// - macOS: ~/Library/Application Support/tocmatch/config.toml
/// - Windows: %APPDATA%\tocmatch\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tocmatch")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Tocmatch Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (TOCM_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite tracklist catalog
#
# Can also be set via:
# - CLI: tocmatch --db /custom/catalog.db build
# - Environment: TOCM_DATABASE_PATH=/custom/catalog.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/catalog.db"

# Lookup server address
bind = "127.0.0.1"
port = 8000

# Threads answering lookup requests
workers = 4

# Distance in milliseconds under which a tracklist counts as a match when
# the request does not pass ?distance=
default_threshold_ms = 5000

# Catalog rows read per page while building the index
chunk_size = 2000

# Rebuild the index from the catalog every N seconds while serving
#rebuild_interval_secs = 86400
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config())
        .context("Failed to write config file")?;

    Ok(true)
}
