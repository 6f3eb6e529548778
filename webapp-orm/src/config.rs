use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::{OrmError, Result};

/// Connection pool settings
///
/// Every key except the credentials has a default, so a `[database]` table
/// only needs `user`, `password` and `db` for a local MySQL server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub driver: Dialect,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Database name, or the database file path for SQLite
    #[serde(default)]
    pub db: Option<String>,

    #[serde(default = "default_charset")]
    pub charset: String,

    /// Default transaction mode for mutating statements
    #[serde(default = "default_autocommit")]
    pub autocommit: bool,

    #[serde(default = "default_maxsize")]
    pub maxsize: u32,

    #[serde(default = "default_minsize")]
    pub minsize: u32,

    /// Seconds an acquirer may wait for a free connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            driver: Dialect::default(),
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            db: None,
            charset: default_charset(),
            autocommit: default_autocommit(),
            maxsize: default_maxsize(),
            minsize: default_minsize(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_autocommit() -> bool {
    true
}

fn default_maxsize() -> u32 {
    10
}

fn default_minsize() -> u32 {
    1
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl PoolConfig {
    /// Config for a SQLite database file (or `:memory:`)
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Dialect::Sqlite,
            db: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| OrmError::config(e.to_string()))
    }

    /// Check that the credentials the driver needs are present.
    pub fn validate(&self) -> Result<()> {
        if self.driver.requires_credentials() {
            for (key, value) in [
                ("user", &self.user),
                ("password", &self.password),
                ("db", &self.db),
            ] {
                if value.is_none() {
                    return Err(OrmError::config(format!(
                        "missing required key '{}' for {} driver",
                        key, self.driver
                    )));
                }
            }
        } else if self.db.as_deref().map_or(true, str::is_empty) {
            return Err(OrmError::config("missing required key 'db' for sqlite driver"));
        }

        if self.maxsize == 0 {
            return Err(OrmError::config("maxsize must be at least 1"));
        }
        if self.minsize > self.maxsize {
            return Err(OrmError::config(format!(
                "minsize ({}) exceeds maxsize ({})",
                self.minsize, self.maxsize
            )));
        }
        Ok(())
    }

    /// Apply `WEBAPP_DB_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(driver) = lookup("WEBAPP_DB_DRIVER") {
            self.driver = driver.parse()?;
        }
        if let Some(host) = lookup("WEBAPP_DB_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("WEBAPP_DB_PORT") {
            self.port = port
                .parse()
                .map_err(|_| OrmError::config(format!("invalid WEBAPP_DB_PORT '{}'", port)))?;
        }
        if let Some(user) = lookup("WEBAPP_DB_USER") {
            self.user = Some(user);
        }
        if let Some(password) = lookup("WEBAPP_DB_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(db) = lookup("WEBAPP_DB_NAME") {
            self.db = Some(db);
        }
        Ok(())
    }
}

/// Top-level configuration file layout
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: PoolConfig,
}

/// Get the webapp config directory path (~/.webapp)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".webapp"))
}

impl AppConfig {
    /// Load config from TOML, then apply environment overrides
    ///
    /// Lookup order:
    /// 1. `explicit` path, if given (must exist)
    /// 2. ./webapp.toml
    /// 3. ~/.webapp/config.toml
    /// 4. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::discover(),
        };
        config.database.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OrmError::config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = toml::from_str(&contents)
            .map_err(|e| OrmError::config(format!("failed to parse {}: {}", path.display(), e)))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn discover() -> Self {
        let candidates = std::iter::once(PathBuf::from("webapp.toml"))
            .chain(config_dir().map(|d| d.join("config.toml")));

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => return config,
                Err(e) => warn!("{}", e),
            }
        }

        debug!("No config file found, using defaults");
        Self::default()
    }
}
