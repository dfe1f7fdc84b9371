use crate::core::{FacadeError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Connection settings parsed from a TOML file.
///
/// All four keys are required and have no defaults. For the SQLite client,
/// `host` is the directory holding the database files and `dbname` names
/// `<host>/<dbname>.db`.
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub username: String,
    pub passwd: String,
    pub dbname: String,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        passwd: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Self {
        ConnectionConfig {
            host: host.into(),
            username: username.into(),
            passwd: passwd.into(),
            dbname: dbname.into(),
        }
    }

    /// Rejects configurations that cannot name a database.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(FacadeError::Config("`host` must not be empty".to_string()));
        }
        if self.dbname.trim().is_empty() {
            return Err(FacadeError::Config("`dbname` must not be empty".to_string()));
        }
        Ok(())
    }
}

// passwd stays out of logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("passwd", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Parses and validates a configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ConnectionConfig> {
    let config: ConnectionConfig =
        toml::from_str(content).map_err(|e| FacadeError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = dbfacade::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConnectionConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| FacadeError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Location used when no `--config` is given.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbfacade").join("config.toml"))
}
