//! # configs
//!
//! Layered settings: built-in defaults, then `config/community-board.toml`
//! (optional), then `COMMUNITY_BOARD__SECTION__KEY` environment variables.
//! Call [`load_dotenv`] first to read a `.env` file into the environment.

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config/community-board";
pub const ENV_PREFIX: &str = "COMMUNITY_BOARD";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Reads `.env` into the process environment and returns its path.
///
/// A missing file is `Ok(None)`. Any other failure is returned so the caller
/// can report it once logging is up.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    dotenv_outcome(dotenvy::dotenv())
}

fn dotenv_outcome(
    result: Result<PathBuf, dotenvy::Error>,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole request body, uploads included.
    pub body_limit_bytes: usize,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    /// Directory holding one sub-directory per post. Its name is the prefix
    /// of every persisted attachment reference.
    pub root: PathBuf,
    pub max_attachments: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseSettings {
    /// PostgreSQL URL. Posts are kept in memory when unset.
    #[serde(default)]
    pub url: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    pub json: bool,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000_i64)?
        .set_default("server.body_limit_bytes", 50_i64 * 1024 * 1024)?
        .set_default("storage.root", "dbFiles")?
        .set_default("storage.max_attachments", 64_i64)?
        .set_default("log.filter", "info")?
        .set_default("log.json", false)?)
}

impl Settings {
    /// Loads the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    /// Defaults overridden by an inline TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.root must not be empty".into()));
        }
        if self.storage.max_attachments == 0 {
            return Err(ConfigError::Invalid(
                "storage.max_attachments must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
