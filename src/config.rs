//! Application configuration
//!
//! Loaded from a TOML file. Every section and field has a default, so an
//! absent file or a partial one is valid.
//!
//! ```toml
//! [server]
//! api_host = "0.0.0.0"
//! api_port = 8080
//! shutdown_timeout = 30
//!
//! [logging]
//! level = "info"
//! format = "pretty"   # or "json"
//!
//! [reservations]
//! lock_timeout_ms = 500
//! hold_ttl_secs = 900          # omit to hold until released
//! expiry_check_interval_secs = 60
//!
//! [geo]
//! cell_size_degrees = 0.01
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::geo::GridGeoIndex;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "PARKING_CONFIG";

/// Longest accepted reservation hold: ten years.
pub const MAX_HOLD_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub reservations: ReservationConfig,
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationConfig {
    /// Longest a reservation waits for a lot's lock before reporting busy
    pub lock_timeout_ms: u64,
    /// Hold time for granted reservations; `None` holds until released
    pub hold_ttl_secs: Option<u64>,
    pub expiry_check_interval_secs: u64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 500,
            hold_ttl_secs: None,
            expiry_check_interval_secs: 60,
        }
    }
}

impl ReservationConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Hold time as a duration. Values past [`MAX_HOLD_TTL_SECS`] are
    /// clamped to it; `validate` rejects them before they get here.
    pub fn hold_ttl(&self) -> Option<chrono::Duration> {
        self.hold_ttl_secs.map(|secs| {
            let secs = secs.min(MAX_HOLD_TTL_SECS);
            chrono::Duration::seconds(secs as i64)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Edge length of a geo index cell in degrees
    pub cell_size_degrees: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            cell_size_degrees: 0.01,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reservations.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "reservations.lock_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.reservations.expiry_check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "reservations.expiry_check_interval_secs must be greater than 0".into(),
            ));
        }
        if let Some(ttl) = self.reservations.hold_ttl_secs {
            if ttl == 0 || ttl > MAX_HOLD_TTL_SECS {
                return Err(ConfigError::Invalid(format!(
                    "reservations.hold_ttl_secs must be in [1, {}] when set, got {}",
                    MAX_HOLD_TTL_SECS, ttl
                )));
            }
        }
        let cell = self.geo.cell_size_degrees;
        let (min_cell, max_cell) = (
            GridGeoIndex::MIN_CELL_SIZE_DEGREES,
            GridGeoIndex::MAX_CELL_SIZE_DEGREES,
        );
        if !(cell.is_finite() && cell >= min_cell && cell <= max_cell) {
            return Err(ConfigError::Invalid(format!(
                "geo.cell_size_degrees must be in [{}, {}], got {}",
                min_cell, max_cell, cell
            )));
        }
        if !matches!(
            self.logging.format.to_lowercase().as_str(),
            "pretty" | "json"
        ) {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.api_host, self.server.api_port)
    }
}

/// `<config dir>/parking-service/config.toml`, or `./config.toml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("parking-service").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}
