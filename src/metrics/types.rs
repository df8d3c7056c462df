use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SamplingError;

/// One instantaneous utilization sample. All percentages are in `0.0..=100.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub cpu_pct: f64,
    pub ram_pct: f64,
    pub disk_pct: f64,
}

impl Reading {
    pub fn new(
        timestamp: DateTime<Utc>,
        cpu_pct: f64,
        ram_pct: f64,
        disk_pct: f64,
    ) -> Result<Self, SamplingError> {
        Ok(Self {
            timestamp,
            cpu_pct: check_pct("cpu", cpu_pct)?,
            ram_pct: check_pct("ram", ram_pct)?,
            disk_pct: check_pct("disk", disk_pct)?,
        })
    }
}

fn check_pct(metric: &'static str, value: f64) -> Result<f64, SamplingError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(SamplingError::OutOfRange { metric, value })
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU: {:.1}% | RAM: {:.1}% | Disk: {:.1}%",
            self.cpu_pct, self.ram_pct, self.disk_pct
        )
    }
}

/// A reading after it has been persisted, with the identity the store assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSample {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub cpu_pct: f64,
    pub ram_pct: f64,
    pub disk_pct: f64,
}

impl StoredSample {
    pub fn from_reading(id: i64, reading: Reading) -> Self {
        Self {
            id,
            timestamp: reading.timestamp,
            cpu_pct: reading.cpu_pct,
            ram_pct: reading.ram_pct,
            disk_pct: reading.disk_pct,
        }
    }
}

impl fmt::Display for StoredSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | CPU: {}% | RAM: {}% | Disk: {}% | Time: {}",
            self.id,
            self.cpu_pct,
            self.ram_pct,
            self.disk_pct,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}
