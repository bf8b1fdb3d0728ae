//! Application settings loaded from `config.toml` and the environment.
//!
//! Every setting has a default, the TOML file may override any of them, and
//! environment variables (usually coming from `.env` through `dotenvy`) win over
//! both. A missing config file is not an error; an unreadable or malformed one is.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_VAR: &str = "ALMACEN_CONFIG";

/// Runtime configuration for the intake service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// TCP port the HTTP server listens on
    pub port: u16,
    /// `SeaORM` connection string
    pub database_url: String,
    /// Shared secret for the bulk delete and report endpoints
    pub admin_key: Option<String>,
    /// Spreadsheet endpoint receiving validated lines
    pub ledger_url: Option<String>,
    /// Directory with the counting UI, served as static files when present
    pub frontend_dir: PathBuf,
    /// Units per basket; enables `cestas_calculadas` on new lines
    pub basket_capacity: Option<u32>,
    /// Per-request timeout for ledger calls, in seconds
    pub ledger_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_key: None,
            ledger_url: None,
            frontend_dir: PathBuf::from("Frontend"),
            basket_capacity: None,
            ledger_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Loads settings from the config file named by `ALMACEN_CONFIG` (default
    /// `./config.toml`) and the process environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
        let contents = read_optional(Path::new(&path))?;
        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Builds settings from optional TOML text and an environment lookup.
    pub fn from_sources<F>(toml_text: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings: Self = match toml_text {
            Some(text) => toml::from_str(text).map_err(|e| Error::Config {
                message: format!("Failed to parse config.toml: {e}"),
            })?,
            None => Self::default(),
        };

        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(port) = var("PORT") {
            settings.port = parse_var("PORT", &port)?;
        }
        if let Some(url) = var("DATABASE_URL") {
            settings.database_url = url;
        }
        if let Some(key) = var("ADMIN_KEY") {
            settings.admin_key = Some(key);
        }
        if let Some(url) = var("APPS_SCRIPT_URL") {
            settings.ledger_url = Some(url);
        }
        if let Some(dir) = var("FRONTEND_DIR") {
            settings.frontend_dir = PathBuf::from(dir);
        }
        if let Some(capacity) = var("BASKET_CAPACITY") {
            settings.basket_capacity = Some(parse_var("BASKET_CAPACITY", &capacity)?);
        }
        if let Some(secs) = var("LEDGER_TIMEOUT_SECS") {
            settings.ledger_timeout_secs = parse_var("LEDGER_TIMEOUT_SECS", &secs)?;
        }

        if settings.basket_capacity == Some(0) {
            return Err(Error::Config {
                message: "basket_capacity must be greater than zero".to_string(),
            });
        }

        Ok(settings)
    }

    /// The configured admin key, ignoring blank values.
    #[must_use]
    pub fn admin_key(&self) -> Option<&str> {
        self.admin_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Whether a ledger endpoint is configured.
    #[must_use]
    pub fn ledger_configured(&self) -> bool {
        self.ledger_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Request timeout for ledger calls.
    #[must_use]
    pub const fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger_timeout_secs)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Ok(None)
        }
        Err(e) => Err(Error::Config {
            message: format!("Failed to read config file {path:?}: {e}"),
        }),
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::Config {
        message: format!("Invalid value for {name}: {value:?}"),
    })
}
