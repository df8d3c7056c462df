use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 60;

pub const ENV_INTERVAL: &str = "SYSREC_INTERVAL_SECS";
pub const ENV_DB_PATH: &str = "SYSREC_DB_PATH";
pub const ENV_STORE_TIMEOUT: &str = "SYSREC_STORE_TIMEOUT_MS";
pub const ENV_DISK_MOUNT: &str = "SYSREC_DISK_MOUNT";

const DEFAULT_DB_PATH: &str = "sysrec.sqlite3";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DISK_MOUNT: &str = "/";

/// Sampling period in whole seconds, bounded to
/// `MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SampleInterval(u64);

impl SampleInterval {
    pub fn new(secs: u64) -> Result<Self, ConfigError> {
        if (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(ConfigError::InvalidInterval {
                value: secs,
                min: MIN_INTERVAL_SECS,
                max: MAX_INTERVAL_SECS,
            })
        }
    }

    pub fn secs(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for SampleInterval {
    fn default() -> Self {
        Self(MIN_INTERVAL_SECS)
    }
}

impl TryFrom<u64> for SampleInterval {
    type Error = ConfigError;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::new(secs)
    }
}

impl From<SampleInterval> for u64 {
    fn from(interval: SampleInterval) -> Self {
        interval.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Only set when the environment asks for a specific interval; otherwise
    /// the remembered setting (or the default) applies.
    pub interval: Option<SampleInterval>,
    pub db_path: PathBuf,
    pub store_timeout: Duration,
    pub disk_mount: PathBuf,
}

impl RecorderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval = match non_empty(&lookup, ENV_INTERVAL) {
            Some(raw) => Some(SampleInterval::new(parse_u64(ENV_INTERVAL, &raw)?)?),
            None => None,
        };

        let store_timeout_ms = match non_empty(&lookup, ENV_STORE_TIMEOUT) {
            Some(raw) => match parse_u64(ENV_STORE_TIMEOUT, &raw)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_STORE_TIMEOUT,
                        value: raw,
                    })
                }
                ms => ms,
            },
            None => DEFAULT_STORE_TIMEOUT_MS,
        };

        Ok(Self {
            interval,
            db_path: non_empty(&lookup, ENV_DB_PATH)
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
                .into(),
            store_timeout: Duration::from_millis(store_timeout_ms),
            disk_mount: non_empty(&lookup, ENV_DISK_MOUNT)
                .unwrap_or_else(|| DEFAULT_DISK_MOUNT.to_string())
                .into(),
        })
    }

    /// `settings.json` lives next to the database file.
    pub fn settings_path(&self) -> PathBuf {
        match self.db_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join("settings.json"),
            _ => PathBuf::from("settings.json"),
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
