// src/recorder.rs
use std::fmt;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use crate::drivers::buffer::rounded_mean;
use crate::drivers::DashboardError;
pub const FORMAT_VERSION: u32 = 1;
/// A recording shorter than this is discarded instead of saved.
pub const MIN_SAVED_SAMPLES: usize = 2;
/// The first delta is undefined, so averaging deltas needs one extra sample.
pub const MIN_DELTA_SAMPLES: usize = 3;
const FILE_STEM_FORMAT: &str = "%y-%m-%d_at_%H-%M";
pub const RECORDING_EXTENSION: &str = "json";
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Clear,
    Recording,
    Loaded,
}
impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Clear => "clear",
            SessionState::Recording => "recording",
            SessionState::Loaded => "loaded",
        })
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub ppm: i64,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delta {
    pub timestamp: DateTime<Local>,
    pub delta: i64,
}
#[derive(Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Saved(PathBuf),
    /// Too short to be worth keeping; the session went back to `Clear`.
    Discarded { samples: usize },
}
/// On-disk form of a recording.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordingSnapshot {
    pub format_version: u32,
    pub started_at: DateTime<Local>,
    pub ended_at: Option<DateTime<Local>>,
    pub samples: Vec<(DateTime<Local>, i64)>,
}
impl RecordingSnapshot {
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.format_version != FORMAT_VERSION {
            return Err(DashboardError::UnsupportedFormat(self.format_version));
        }
        if self.samples.len() < MIN_SAVED_SAMPLES {
            return Err(DashboardError::TooFewSamples {
                count: self.samples.len(),
                required: MIN_SAVED_SAMPLES,
            });
        }
        for pair in self.samples.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(DashboardError::OutOfOrderSample {
                    timestamp: pair[1].0.to_rfc3339(),
                });
            }
        }
        Ok(())
    }
}
/// Directory holding recording snapshots.
pub struct RecordingStore {
    dir: PathBuf,
}
impl RecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    pub fn path_for(&self, started_at: &DateTime<Local>) -> PathBuf {
        self.dir.join(format!(
            "{}.{RECORDING_EXTENSION}",
            started_at.format(FILE_STEM_FORMAT)
        ))
    }
    pub fn save(&self, snapshot: &RecordingSnapshot) -> Result<PathBuf, DashboardError> {
        let path = self.path_for(&snapshot.started_at);
        let text =
            serde_json::to_string_pretty(snapshot).map_err(|e| DashboardError::json(&path, e))?;
        std::fs::write(&path, text).map_err(|e| DashboardError::io(&path, e))?;
        info!("recording saved: {}", path.display());
        Ok(path)
    }
    pub fn load(&self, path: &Path) -> Result<RecordingSnapshot, DashboardError> {
        if !path.exists() {
            return Err(DashboardError::MissingFile(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| DashboardError::io(path, e))?;
        let snapshot: RecordingSnapshot =
            serde_json::from_str(&text).map_err(|e| DashboardError::json(path, e))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
/// Recording lifecycle: `Clear -> Recording -> Loaded -> Clear`.
#[derive(Debug)]
pub struct RecordingSession {
    state: SessionState,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,
    samples: Vec<Sample>,
    path: Option<PathBuf>,
}
impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}
impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Clear,
            started_at: None,
            ended_at: None,
            samples: Vec::new(),
            path: None,
        }
    }
    pub fn state(&self) -> SessionState {
        self.state
    }
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }
    pub fn ended_at(&self) -> Option<DateTime<Local>> {
        self.ended_at
    }
    /// File this session was saved to or loaded from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
    pub fn can_start(&self) -> bool {
        self.state == SessionState::Clear
    }
    pub fn can_stop(&self) -> bool {
        self.state == SessionState::Recording
    }
    pub fn can_clear(&self) -> bool {
        self.state == SessionState::Loaded
    }
    pub fn can_load(&self) -> bool {
        self.state != SessionState::Recording
    }
    fn reject(&self, action: &'static str) -> DashboardError {
        warn!("rejected {action} while {}", self.state);
        DashboardError::InvalidTransition {
            state: self.state,
            action,
        }
    }
    fn reset(&mut self) {
        self.state = SessionState::Clear;
        self.started_at = None;
        self.ended_at = None;
        self.samples.clear();
        self.path = None;
    }
    pub fn start(&mut self, now: DateTime<Local>) -> Result<(), DashboardError> {
        if !self.can_start() {
            return Err(self.reject("start"));
        }
        self.reset();
        self.state = SessionState::Recording;
        self.started_at = Some(now);
        info!("recording started at {}", now.format(FILE_STEM_FORMAT));
        Ok(())
    }
    pub fn record(&mut self, sample: Sample) -> Result<(), DashboardError> {
        if self.state != SessionState::Recording {
            return Err(self.reject("record"));
        }
        if let Some(last) = self.samples.last() {
            if sample.timestamp <= last.timestamp {
                return Err(DashboardError::OutOfOrderSample {
                    timestamp: sample.timestamp.to_rfc3339(),
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }
    /// End the recording. Long enough recordings are persisted through `store`
    /// and stay on screen as `Loaded`; shorter ones are dropped.
    ///
    /// A failed write still leaves the data `Loaded` so it can be inspected.
    pub fn stop(
        &mut self,
        now: DateTime<Local>,
        store: &RecordingStore,
    ) -> Result<StopOutcome, DashboardError> {
        if !self.can_stop() {
            return Err(self.reject("stop"));
        }
        if self.samples.len() < MIN_SAVED_SAMPLES {
            let samples = self.samples.len();
            warn!("recording too short ({samples} samples), not saved");
            self.reset();
            return Ok(StopOutcome::Discarded { samples });
        }
        self.ended_at = Some(now);
        self.state = SessionState::Loaded;
        let path = store.save(&self.snapshot())?;
        self.path = Some(path.clone());
        Ok(StopOutcome::Saved(path))
    }
    pub fn clear(&mut self) -> Result<(), DashboardError> {
        if !self.can_clear() {
            return Err(self.reject("clear"));
        }
        self.reset();
        Ok(())
    }
    /// Replace the session with a stored recording. On failure nothing changes.
    pub fn load(&mut self, path: &Path, store: &RecordingStore) -> Result<(), DashboardError> {
        if !self.can_load() {
            return Err(self.reject("load"));
        }
        let snapshot = store.load(path)?;
        self.state = SessionState::Loaded;
        self.started_at = Some(snapshot.started_at);
        self.ended_at = snapshot.ended_at;
        self.samples = snapshot
            .samples
            .into_iter()
            .map(|(timestamp, ppm)| Sample { timestamp, ppm })
            .collect();
        self.path = Some(path.to_path_buf());
        info!("loaded {} samples from {}", self.samples.len(), path.display());
        Ok(())
    }
    pub fn snapshot(&self) -> RecordingSnapshot {
        RecordingSnapshot {
            format_version: FORMAT_VERSION,
            started_at: self
                .started_at
                .or_else(|| self.samples.first().map(|s| s.timestamp))
                .unwrap_or_else(Local::now),
            ended_at: self.ended_at,
            samples: self.samples.iter().map(|s| (s.timestamp, s.ppm)).collect(),
        }
    }
    /// Average ppm, once there are enough samples to be meaningful.
    pub fn mean(&self) -> Option<i64> {
        if self.samples.len() < MIN_SAVED_SAMPLES {
            return None;
        }
        rounded_mean(self.samples.iter().map(|s| s.ppm))
    }
    /// Change between consecutive samples; the first sample has none.
    pub fn deltas(&self) -> Vec<Delta> {
        self.samples
            .windows(2)
            .map(|pair| Delta {
                timestamp: pair[1].timestamp,
                delta: pair[1].ppm - pair[0].ppm,
            })
            .collect()
    }
    pub fn mean_delta(&self) -> Option<i64> {
        if self.samples.len() < MIN_DELTA_SAMPLES {
            return None;
        }
        rounded_mean(self.deltas().into_iter().map(|d| d.delta))
    }
    /// Minutes since the first sample, for plotting.
    pub fn elapsed_minutes(&self, timestamp: DateTime<Local>) -> f64 {
        let origin = self
            .samples
            .first()
            .map(|s| s.timestamp)
            .or(self.started_at)
            .unwrap_or(timestamp);
        (timestamp - origin).num_seconds() as f64 / 60.0
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    fn at(minute: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }
    fn sample(minute: i64, ppm: i64) -> Sample {
        Sample {
            timestamp: at(minute),
            ppm,
        }
    }
    fn recording_with(values: &[i64]) -> RecordingSession {
        let mut session = RecordingSession::new();
        session.start(at(0)).unwrap();
        for (i, v) in values.iter().enumerate() {
            session.record(sample(2 * (i as i64 + 1), *v)).unwrap();
        }
        session
    }
    fn json_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| {
                e.as_ref().unwrap().path().extension().and_then(|x| x.to_str())
                    == Some(RECORDING_EXTENSION)
            })
            .count()
    }
    #[test]
    fn stop_with_one_sample_discards_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut session = recording_with(&[800]);
        let outcome = session.stop(at(5), &store).unwrap();
        assert_eq!(outcome, StopOutcome::Discarded { samples: 1 });
        assert_eq!(session.state(), SessionState::Clear);
        assert!(session.samples().is_empty());
        assert_eq!(json_files(dir.path()), 0);
    }
    #[test]
    fn stop_with_two_samples_persists_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut session = recording_with(&[800, 900]);
        let outcome = session.stop(at(5), &store).unwrap();
        let expected = store.path_for(&at(0));
        assert_eq!(outcome, StopOutcome::Saved(expected.clone()));
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.path(), Some(expected.as_path()));
        assert!(expected.ends_with("24-03-01_at_12-00.json"));
        assert_eq!(json_files(dir.path()), 1);
    }
    #[test]
    fn record_is_ignored_outside_recording() {
        let mut session = RecordingSession::new();
        assert!(matches!(
            session.record(sample(1, 500)),
            Err(DashboardError::InvalidTransition {
                state: SessionState::Clear,
                ..
            })
        ));
        assert!(session.samples().is_empty());
    }
    #[test]
    fn timestamps_must_increase() {
        let mut session = recording_with(&[700]);
        assert!(matches!(
            session.record(sample(2, 710)),
            Err(DashboardError::OutOfOrderSample { .. })
        ));
        assert_eq!(session.samples().len(), 1);
    }
    #[test]
    fn transitions_follow_the_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut session = RecordingSession::new();
        assert!(session.clear().is_err());
        assert!(session.stop(at(0), &store).is_err());
        session.start(at(0)).unwrap();
        assert!(!session.can_load());
        assert!(session.start(at(1)).is_err());
        assert!(session.clear().is_err());
        session.record(sample(1, 600)).unwrap();
        session.record(sample(3, 650)).unwrap();
        session.stop(at(4), &store).unwrap();
        assert!(session.start(at(5)).is_err());
        session.clear().unwrap();
        assert_eq!(session.state(), SessionState::Clear);
        assert_eq!(session.started_at(), None);
    }
    #[test]
    fn load_is_rejected_while_recording() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let StopOutcome::Saved(path) = recording_with(&[500, 600]).stop(at(5), &store).unwrap()
        else {
            panic!("expected save");
        };
        let mut session = recording_with(&[700, 710, 720]);
        assert!(matches!(
            session.load(&path, &store),
            Err(DashboardError::InvalidTransition {
                state: SessionState::Recording,
                action: "load",
            })
        ));
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.samples().len(), 3);
        assert_eq!(session.path(), None);
    }
    #[test]
    fn loading_while_loaded_replaces_data_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut first = recording_with(&[500, 600, 700]);
        let StopOutcome::Saved(first_path) = first.stop(at(7), &store).unwrap() else {
            panic!("expected save");
        };
        let mut second = RecordingSession::new();
        second.start(at(60)).unwrap();
        second.record(sample(62, 900)).unwrap();
        second.record(sample(64, 950)).unwrap();
        let StopOutcome::Saved(second_path) = second.stop(at(65), &store).unwrap() else {
            panic!("expected save");
        };
        assert_ne!(first_path, second_path);
        first.load(&second_path, &store).unwrap();
        assert_eq!(first.state(), SessionState::Loaded);
        assert_eq!(first.path(), Some(second_path.as_path()));
        assert_eq!(first.samples(), second.samples());
        assert_eq!(first.started_at(), Some(at(60)));
        assert_eq!(first.ended_at(), Some(at(65)));
    }
    #[test]
    fn loading_missing_file_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut session = RecordingSession::new();
        let err = session
            .load(&dir.path().join("nope.json"), &store)
            .unwrap_err();
        assert!(matches!(err, DashboardError::MissingFile(_)));
        assert_eq!(session.state(), SessionState::Clear);
    }
    #[test]
    fn loading_corrupt_file_leaves_loaded_session_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut session = recording_with(&[500, 600, 700]);
        let saved = match session.stop(at(9), &store).unwrap() {
            StopOutcome::Saved(path) => path,
            other => panic!("unexpected {other:?}"),
        };
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            session.load(&bad, &store),
            Err(DashboardError::Json { .. })
        ));
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.path(), Some(saved.as_path()));
        assert_eq!(session.samples().len(), 3);
    }
    #[test]
    fn saved_recording_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut session = recording_with(&[500, 650, 610]);
        let StopOutcome::Saved(path) = session.stop(at(7), &store).unwrap() else {
            panic!("expected save");
        };
        let mut other = RecordingSession::new();
        other.load(&path, &store).unwrap();
        assert_eq!(other.state(), SessionState::Loaded);
        assert_eq!(other.samples(), session.samples());
        assert_eq!(other.started_at(), Some(at(0)));
        assert_eq!(other.ended_at(), Some(at(7)));
    }
    #[test]
    fn unknown_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut snapshot = recording_with(&[500, 600]).snapshot();
        snapshot.format_version = 7;
        let path = dir.path().join("future.json");
        std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();
        assert!(matches!(
            store.load(&path),
            Err(DashboardError::UnsupportedFormat(7))
        ));
    }
    #[test]
    fn stats_need_enough_samples() {
        let session = recording_with(&[400]);
        assert_eq!(session.mean(), None);
        assert!(session.deltas().is_empty());
        let session = recording_with(&[400, 600]);
        assert_eq!(session.mean(), Some(500));
        assert_eq!(session.mean_delta(), None);
        let session = recording_with(&[400, 600, 500]);
        assert_eq!(session.mean_delta(), Some(50));
    }
    #[test]
    fn delta_series_skips_first_sample() {
        for n in 0..6 {
            let values: Vec<i64> = (0..n).map(|i| 400 + 10 * i * i).collect();
            let session = recording_with(&values);
            let deltas = session.deltas();
            assert_eq!(deltas.len(), values.len().saturating_sub(1));
            for (i, d) in deltas.iter().enumerate() {
                assert_eq!(d.delta, values[i + 1] - values[i]);
                assert_eq!(d.timestamp, session.samples()[i + 1].timestamp);
            }
        }
    }
}
