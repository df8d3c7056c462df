use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::config::SampleInterval;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    #[serde(default)]
    interval_secs: Option<SampleInterval>,
}

/// Operator preferences that outlive a single run.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn interval(&self) -> Option<SampleInterval> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .interval_secs
    }

    pub fn update_interval(&self, interval: SampleInterval) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.interval_secs = Some(interval);
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn interval_survives_reload() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.interval(), None);
        store.update_interval(SampleInterval::new(3).unwrap()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.interval().map(SampleInterval::secs), Some(3));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{"intervalSecs": 0}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.interval(), None);
    }
}
