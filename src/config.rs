//! File configuration for tuning knobs and the database location.
//!
//! Loaded from TOML. Every key is optional; a missing file means defaults.
//!
//! ```toml
//! database_path = "/var/lib/sharekeeper/links.db"
//!
//! [maintenance]
//! batch_size = 5
//! max_attempts = 3
//! retry_delay_ms = 2000
//! batch_cooldown_ms = 5000
//! schedule_interval_secs = 3600
//!
//! [resolver]
//! deadline_secs = 30
//! connect_timeout_secs = 10
//! read_timeout_secs = 20
//! ```

use std::env;
use std::ffi::OsString;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::maintenance::{
    DEFAULT_BATCH_COOLDOWN, DEFAULT_BATCH_SIZE, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
    DEFAULT_SCHEDULE_INTERVAL, MaintenanceSettings, RetryPolicy,
};
use crate::resolver::{DEFAULT_RESOLVE_DEADLINE, ResolverHttpSettings};

const APP_DIR: &str = "sharekeeper";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "links.db";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}\n  Suggestion: Check the path and file permissions")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config '{origin}': {source}\n  Suggestion: Check the TOML syntax and key names")]
    Parse {
        /// Where the text came from.
        origin: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range.
    #[error(
        "invalid config value for `{field}`: {value}\n  Suggestion: Expected range: {expected}"
    )]
    Invalid {
        /// Dotted key name.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Accepted range.
        expected: String,
    },
}

/// `[maintenance]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaintenanceConfig {
    /// Links resolved concurrently per batch.
    pub batch_size: usize,
    /// Resolve attempts per link per run.
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Pause between batches, in milliseconds.
    pub batch_cooldown_ms: u64,
    /// Time between scheduled runs, in seconds.
    pub schedule_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: duration_millis(DEFAULT_RETRY_DELAY),
            batch_cooldown_ms: duration_millis(DEFAULT_BATCH_COOLDOWN),
            schedule_interval_secs: DEFAULT_SCHEDULE_INTERVAL.as_secs(),
        }
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Overall deadline for one resolution, in seconds.
    pub deadline_secs: u64,
    /// HTTP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP request timeout, in seconds.
    pub read_timeout_secs: u64,
    /// Overrides the browser `User-Agent`.
    pub user_agent: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let http = ResolverHttpSettings::default();
        Self {
            deadline_secs: DEFAULT_RESOLVE_DEADLINE.as_secs(),
            connect_timeout_secs: http.connect_timeout.as_secs(),
            read_timeout_secs: http.read_timeout.as_secs(),
            user_agent: None,
        }
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database file; defaults to the XDG data directory.
    pub database_path: Option<PathBuf>,
    /// Maintenance engine knobs.
    pub maintenance: MaintenanceConfig,
    /// Resolver knobs.
    pub resolver: ResolverConfig,
}

/// A config plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path that was (or would have been) read.
    pub path: Option<PathBuf>,
    /// Effective configuration.
    pub config: Config,
    /// Whether `config` came from a file on disk.
    pub loaded_from_file: bool,
}

impl Config {
    /// Loads configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used if
    /// the file is there, otherwise defaults apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        if let Some(path) = explicit {
            return Ok(LoadedConfig {
                path: Some(path.to_path_buf()),
                config: Self::from_file(path)?,
                loaded_from_file: true,
            });
        }

        let path = default_config_path();
        match path.as_deref() {
            Some(candidate) if candidate.exists() => Ok(LoadedConfig {
                config: Self::from_file(candidate)?,
                path,
                loaded_from_file: true,
            }),
            _ => {
                debug!("no config file found; using defaults");
                Ok(LoadedConfig {
                    path,
                    config: Self::default(),
                    loaded_from_file: false,
                })
            }
        }
    }

    /// Reads, parses and validates one file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading config file");
        Self::parse(&raw, &path.display().to_string())
    }

    /// Parses and validates TOML text; `origin` labels errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn parse(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.maintenance;
        check_range("maintenance.batch_size", m.batch_size, 1..=100)?;
        check_range("maintenance.max_attempts", m.max_attempts, 1..=10)?;
        check_range("maintenance.retry_delay_ms", m.retry_delay_ms, 0..=60_000)?;
        check_range("maintenance.batch_cooldown_ms", m.batch_cooldown_ms, 0..=600_000)?;
        check_range(
            "maintenance.schedule_interval_secs",
            m.schedule_interval_secs,
            1..=604_800,
        )?;

        let r = &self.resolver;
        check_range("resolver.deadline_secs", r.deadline_secs, 1..=600)?;
        check_range("resolver.connect_timeout_secs", r.connect_timeout_secs, 1..=3600)?;
        check_range("resolver.read_timeout_secs", r.read_timeout_secs, 1..=3600)?;
        if let Some(agent) = &r.user_agent
            && agent.trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                field: "resolver.user_agent",
                value: format!("{agent:?}"),
                expected: "a non-empty string".to_string(),
            });
        }

        Ok(())
    }

    /// Engine settings derived from `[maintenance]`.
    #[must_use]
    pub fn maintenance_settings(&self) -> MaintenanceSettings {
        MaintenanceSettings {
            batch_size: self.maintenance.batch_size,
            retry: RetryPolicy::new(
                self.maintenance.max_attempts,
                Duration::from_millis(self.maintenance.retry_delay_ms),
            ),
            batch_cooldown: Duration::from_millis(self.maintenance.batch_cooldown_ms),
        }
    }

    /// HTTP client settings derived from `[resolver]`.
    #[must_use]
    pub fn resolver_http_settings(&self) -> ResolverHttpSettings {
        let mut settings = ResolverHttpSettings {
            connect_timeout: Duration::from_secs(self.resolver.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.resolver.read_timeout_secs),
            ..ResolverHttpSettings::default()
        };
        if let Some(agent) = &self.resolver.user_agent {
            settings.user_agent.clone_from(agent);
        }
        settings
    }

    /// Overall per-resolution deadline.
    #[must_use]
    pub fn resolve_deadline(&self) -> Duration {
        Duration::from_secs(self.resolver.deadline_secs)
    }

    /// Time between scheduled runs.
    #[must_use]
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance.schedule_interval_secs)
    }

    /// Database location: the configured path, else the XDG data directory,
    /// else `links.db` in the working directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .or_else(default_database_path)
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }
}

fn check_range<T>(field: &'static str, value: T, range: RangeInclusive<T>) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        field,
        value: value.to_string(),
        expected: format!("{}..={}", range.start(), range.end()),
    })
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/sharekeeper/config.toml`
/// 2. `$HOME/.config/sharekeeper/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    base_dir(
        env_var_non_empty_os("XDG_CONFIG_HOME"),
        env_var_non_empty_os("HOME"),
        ".config",
    )
    .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Resolves the default database path.
///
/// Priority:
/// 1. `$XDG_DATA_HOME/sharekeeper/links.db`
/// 2. `$HOME/.local/share/sharekeeper/links.db`
#[must_use]
pub fn default_database_path() -> Option<PathBuf> {
    base_dir(
        env_var_non_empty_os("XDG_DATA_HOME"),
        env_var_non_empty_os("HOME"),
        ".local/share",
    )
    .map(|dir| dir.join(APP_DIR).join(DATABASE_FILE))
}

fn base_dir(xdg: Option<OsString>, home: Option<OsString>, home_suffix: &str) -> Option<PathBuf> {
    if let Some(xdg) = xdg {
        return Some(PathBuf::from(xdg));
    }
    home.map(|home| PathBuf::from(home).join(home_suffix))
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
