// src/settings.rs
use std::path::{Path, PathBuf};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use crate::drivers::DashboardError;
pub const SETTINGS_FILE_NAME: &str = "settings.json";
/// Calibration anchors, alert thresholds and the recording interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Raw ADC reading at 400 ppm.
    pub v400: u32,
    /// Raw ADC reading at 40000 ppm.
    pub v40000: u32,
    pub low_co2: u32,
    pub high_co2: u32,
    pub very_high_co2: u32,
    /// Minutes between two recorded samples.
    pub measurement_interval_min: u32,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            v400: 4000,
            v40000: 1000,
            low_co2: 413,
            high_co2: 2000,
            very_high_co2: 5000,
            measurement_interval_min: 2,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingKey {
    V400,
    V40000,
    LowCo2,
    HighCo2,
    VeryHighCo2,
    MeasurementInterval,
}
impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::V400,
        SettingKey::V40000,
        SettingKey::LowCo2,
        SettingKey::HighCo2,
        SettingKey::VeryHighCo2,
        SettingKey::MeasurementInterval,
    ];
    pub fn label(self) -> &'static str {
        match self {
            SettingKey::V400 => "400 ppm calibration value:",
            SettingKey::V40000 => "40000 ppm calibration value:",
            SettingKey::LowCo2 => "Low CO2 (in ppm):",
            SettingKey::HighCo2 => "High CO2 (in ppm):",
            SettingKey::VeryHighCo2 => "Very High CO2 (in ppm):",
            SettingKey::MeasurementInterval => "Interval for recording measurements (in min):",
        }
    }
}
impl Settings {
    pub fn get(&self, key: SettingKey) -> u32 {
        match key {
            SettingKey::V400 => self.v400,
            SettingKey::V40000 => self.v40000,
            SettingKey::LowCo2 => self.low_co2,
            SettingKey::HighCo2 => self.high_co2,
            SettingKey::VeryHighCo2 => self.very_high_co2,
            SettingKey::MeasurementInterval => self.measurement_interval_min,
        }
    }
    fn slot(&mut self, key: SettingKey) -> &mut u32 {
        match key {
            SettingKey::V400 => &mut self.v400,
            SettingKey::V40000 => &mut self.v40000,
            SettingKey::LowCo2 => &mut self.low_co2,
            SettingKey::HighCo2 => &mut self.high_co2,
            SettingKey::VeryHighCo2 => &mut self.very_high_co2,
            SettingKey::MeasurementInterval => &mut self.measurement_interval_min,
        }
    }
    /// Adopt `input` for `key` if it is a plain positive integer.
    /// Anything else leaves the old value in place. Returns whether the value changed.
    pub fn apply_input(&mut self, key: SettingKey, input: &str) -> bool {
        let input = input.trim();
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let Ok(value) = input.parse::<u32>() else {
            return false;
        };
        if value < 1 {
            return false;
        }
        let slot = self.slot(key);
        let changed = *slot != value;
        *slot = value;
        changed
    }
    pub fn apply_inputs<'a>(
        &mut self,
        inputs: impl IntoIterator<Item = (SettingKey, &'a str)>,
    ) -> Vec<SettingKey> {
        inputs
            .into_iter()
            .filter(|(key, input)| self.apply_input(*key, input))
            .map(|(key, _)| key)
            .collect()
    }
}
/// Single JSON snapshot of [`Settings`], overwritten wholesale on save.
pub struct SettingsStore {
    path: PathBuf,
}
impl SettingsStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(SETTINGS_FILE_NAME),
        }
    }
    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// `Ok(None)` when no settings file has been written yet.
    pub fn load(&self) -> Result<Option<Settings>, DashboardError> {
        if !self.path.exists() {
            info!("no settings file found at {}", self.path.display());
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| DashboardError::io(&self.path, e))?;
        let settings: Settings =
            serde_json::from_str(&text).map_err(|e| DashboardError::json(&self.path, e))?;
        info!("settings loaded from {}", self.path.display());
        Ok(Some(settings))
    }
    /// Load the stored settings, falling back to defaults when missing or unreadable.
    pub fn load_or_default(&self) -> Settings {
        match self.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("ignoring settings file: {e}");
                Settings::default()
            }
        }
    }
    pub fn save(&self, settings: &Settings) -> Result<(), DashboardError> {
        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| DashboardError::json(&self.path, e))?;
        std::fs::write(&self.path, text).map_err(|e| DashboardError::io(&self.path, e))?;
        info!("settings saved to {}", self.path.display());
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn invalid_input_keeps_previous_value() {
        let mut settings = Settings::default();
        for input in ["", "abc", "-5", "0", "12.5", "+3", "99999999999"] {
            assert!(!settings.apply_input(SettingKey::HighCo2, input), "{input}");
        }
        assert_eq!(settings.high_co2, 2000);
        assert!(settings.apply_input(SettingKey::HighCo2, " 1800 "));
        assert_eq!(settings.high_co2, 1800);
    }
    #[test]
    fn apply_inputs_reports_changed_keys() {
        let mut settings = Settings::default();
        let changed = settings.apply_inputs([
            (SettingKey::V400, "4000"),
            (SettingKey::LowCo2, "420"),
            (SettingKey::MeasurementInterval, "x"),
        ]);
        assert_eq!(changed, vec![SettingKey::LowCo2]);
        assert_eq!(settings.measurement_interval_min, 2);
    }
    #[test]
    fn store_round_trips_and_tolerates_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), None);
        let mut settings = Settings::default();
        settings.very_high_co2 = 4500;
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), Some(settings));
        std::fs::write(store.path(), r#"{"low_co2": 450}"#).unwrap();
        let partial = store.load().unwrap().unwrap();
        assert_eq!(partial.low_co2, 450);
        assert_eq!(partial.v400, Settings::default().v400);
    }
    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(DashboardError::Json { .. })));
        assert_eq!(store.load_or_default(), Settings::default());
    }
}
