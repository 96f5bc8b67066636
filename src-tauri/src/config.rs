//! Application configuration
//!
//! Compile-time defaults plus the user editable `settings.json`.

use crate::error::{AppError, AppResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory created under the platform's local data dir
pub const APP_DIR_NAME: &str = "HealthTracker";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "HEALTH_TRACKER_DATA_DIR";

/// Settings file name inside the data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Seconds between scheduler ticks
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Longest allowed tick interval. Anything coarser can step over a whole minute.
pub const MAX_POLL_INTERVAL_SECS: u64 = 60;

/// Upper bound for the catch-up window
pub const MAX_CATCH_UP_MINUTES: u32 = 59;

/// Daily water goal in millilitres
pub const WATER_GOAL_ML: f64 = 2000.0;

/// Nightly sleep goal in hours
pub const SLEEP_GOAL_HOURS: f64 = 8.0;

/// Below this many hours of sleep the dashboard suggests more rest
pub const SHORT_SLEEP_HOURS: f64 = 6.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub poll_interval_secs: u64,
    /// Minutes after the scheduled time during which a missed reminder still fires.
    /// Zero keeps exact-minute matching.
    pub catch_up_minutes: u32,
    pub data_dir: Option<PathBuf>,
    pub water_goal_ml: f64,
    pub sleep_goal_hours: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            catch_up_minutes: 0,
            data_dir: None,
            water_goal_ml: WATER_GOAL_ML,
            sleep_goal_hours: SLEEP_GOAL_HOURS,
        }
    }
}

impl Settings {
    /// Load settings from `dir`, falling back to defaults when the file is missing or unreadable
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Self::default();
        }

        let settings = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Settings>(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Ignoring malformed {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        };

        settings.normalized()
    }

    pub fn save(&self, dir: &Path) -> AppResult<()> {
        fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Clamp values into the ranges the scheduler and dashboard can honour
    pub fn normalized(mut self) -> Self {
        self.poll_interval_secs = self.poll_interval_secs.clamp(1, MAX_POLL_INTERVAL_SECS);
        self.catch_up_minutes = self.catch_up_minutes.min(MAX_CATCH_UP_MINUTES);
        if self.water_goal_ml.is_nan() || self.water_goal_ml <= 0.0 {
            self.water_goal_ml = WATER_GOAL_ML;
        }
        if self.sleep_goal_hours.is_nan() || self.sleep_goal_hours <= 0.0 {
            self.sleep_goal_hours = SLEEP_GOAL_HOURS;
        }
        self
    }
}

/// Resolve the data directory: environment override, then the platform default.
pub fn default_data_dir() -> AppResult<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::config("Failed to get local data dir"))
}

/// Resolve the data directory and the settings stored in it.
///
/// A `dataDir` entry in the settings file redirects record storage, the settings file
/// itself always lives in the default directory.
pub fn resolve() -> AppResult<(PathBuf, Settings)> {
    let base = default_data_dir()?;
    fs::create_dir_all(&base).map_err(|e| AppError::config(e.to_string()))?;

    let settings = Settings::load(&base);
    let data_dir = settings.data_dir.clone().unwrap_or_else(|| base.clone());
    if data_dir != base {
        fs::create_dir_all(&data_dir).map_err(|e| AppError::config(e.to_string()))?;
    }
    info!("Using data directory {}", data_dir.display());

    Ok((data_dir, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_interval_is_within_a_minute() {
        assert!(DEFAULT_POLL_INTERVAL_SECS > 0);
        assert!(DEFAULT_POLL_INTERVAL_SECS <= MAX_POLL_INTERVAL_SECS);
    }

    #[test]
    fn test_load_missing_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }

    #[test]
    fn test_load_malformed_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), r#"{"catchUpMinutes": 5}"#).unwrap();

        let settings = Settings::load(dir.path());
        assert_eq!(settings.catch_up_minutes, 5);
        assert_eq!(settings.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"pollIntervalSecs": 300, "catchUpMinutes": 600, "waterGoalMl": 0}"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path());
        assert_eq!(settings.poll_interval_secs, MAX_POLL_INTERVAL_SECS);
        assert_eq!(settings.catch_up_minutes, MAX_CATCH_UP_MINUTES);
        assert_eq!(settings.water_goal_ml, WATER_GOAL_ML);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            poll_interval_secs: 30,
            catch_up_minutes: 2,
            ..Settings::default()
        };

        settings.save(dir.path()).unwrap();
        assert_eq!(Settings::load(dir.path()), settings);
    }
}
