//! Configuration for the tome catalog.
//!
//! Values are layered with [`figment`], later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A configuration file (TOML, YAML or JSON, chosen by extension)
//! 3. Environment variables prefixed with `TOME_`, using `__` to descend
//!    into sections (e.g. `TOME_QUERY__COUNT_CACHE=false`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "TOME_";
const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "catalog.sqlite";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Location of the SQLite catalog file.
    pub path: PathBuf,
    /// Upper bound of pooled connections.
    pub max_connections: u32,
    /// How long a statement waits on a locked database before failing, in
    /// milliseconds. This is also the effective deadline for every query the
    /// engine issues.
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Memoize total counts for unfiltered, unrestricted listings.
    pub count_cache: bool,
    /// How far back the `recent` filter reaches, in days.
    pub recent_window_days: u32,
    /// Page size used when a caller leaves `limit` unset. Zero means
    /// unlimited.
    pub default_limit: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = ProjectDirs::from("", "", "tome")
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME));
        Self {
            path,
            max_connections: 5,
            busy_timeout_ms: 1500,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            count_cache: true,
            recent_window_days: 30,
            default_limit: 0,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Config {
    /// Default location of the configuration file, if the platform has a
    /// notion of a per-user configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tome").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load configuration from an explicit file.
    ///
    /// Unlike [`Config::discover`], a missing file is an error here: the
    /// caller asked for that file specifically.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        Self::extract(Self::with_file(Self::defaults(), path))
    }

    /// Load configuration from the default location if a file exists there,
    /// otherwise from defaults and the environment only.
    pub fn discover() -> Result<Self> {
        let figment = match Self::default_path().filter(|path| path.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration file");
                Self::with_file(Self::defaults(), &path)
            },
            None => Self::defaults(),
        };
        Self::extract(figment)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn with_file(figment: Figment, path: &Path) -> Figment {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        }
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::OutOfRange("database.max_connections"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.query.count_cache);
        assert_eq!(config.query.recent_window_days, 30);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.path.ends_with(DATABASE_FILE_NAME));
    }

    #[rstest]
    #[case("config.toml", "[query]\ncount_cache = false\nrecent_window_days = 7\n")]
    #[case("config.yaml", "query:\n  count_cache: false\n  recent_window_days: 7\n")]
    #[case("config.json", r#"{"query": {"count_cache": false, "recent_window_days": 7}}"#)]
    fn test_load_formats(#[case] name: &str, #[case] contents: &str) {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, name, contents);
        let config = Config::load(&path).unwrap();
        assert!(!config.query.count_cache);
        assert_eq!(config.query.recent_window_days, 7);
        // Untouched sections keep their defaults.
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_zero_connections() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.toml", "[database]\nmax_connections = 0\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::OutOfRange("database.max_connections")));
    }

    #[test]
    fn test_load_rejects_wrong_type() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.toml", "[query]\ncount_cache = \"sometimes\"\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid));
    }
}
