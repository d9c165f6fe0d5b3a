use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::calendar::DEFAULT_SELLING_DAYS;

pub const DEFAULT_ROWS_PER_DAY: usize = 3;
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 5;
pub const DEFAULT_STORAGE_KEY: &str = "leadTrackerProData";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Placeholder rows shown for a selling day with no stored leads.
    pub rows_per_day: usize,
    /// Weekday numbers (0 = Sunday .. 6 = Saturday) that get day buckets.
    pub selling_days: Vec<u32>,
    pub stale_after_days: i64,
    pub storage_key: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            rows_per_day: DEFAULT_ROWS_PER_DAY,
            selling_days: DEFAULT_SELLING_DAYS.to_vec(),
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            storage_key: DEFAULT_STORAGE_KEY.into(),
        }
    }
}

impl TrackerSettings {
    pub fn stale_after(&self) -> Duration {
        Duration::days(self.stale_after_days)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tracker(&self) -> TrackerSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_tracker(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
