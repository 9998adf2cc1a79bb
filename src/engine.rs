// src/engine.rs
use std::time::{Duration, Instant};
use chrono::{DateTime, Local};
use log::{info, warn};
use crate::drivers::pipeline::LIVE_TICK_SECS;
use crate::drivers::{
    render_recording_png, CalibrationMonitor, DashboardError, LiveDashboard, PlotStyle,
    SampleSource,
};
use crate::recorder::{RecordingSession, RecordingStore, Sample, StopOutcome};
use crate::settings::{SettingKey, Settings, SettingsStore};
use crate::types::*;
/// Fixed-period timer polled from the UI loop.
#[derive(Clone, Copy, Debug)]
pub struct Ticker {
    period: Duration,
    next_due: Instant,
}
impl Ticker {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }
    pub fn restart(&mut self, now: Instant) {
        self.next_due = now + self.period;
    }
    pub fn set_period(&mut self, period: Duration, now: Instant) {
        self.period = period;
        self.restart(now);
    }
    /// True once per elapsed period. Missed periods are not replayed.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}
fn recording_period(settings: &Settings) -> Duration {
    Duration::from_secs(settings.measurement_interval_min as u64 * 60)
}
/// Owns every piece of mutable dashboard state.
///
/// The GUI sends [`GuiCommand`]s, calls [`Engine::poll`] every frame and drains
/// [`EngineMessage`]s; everything runs on the UI thread.
pub struct Engine<S: SampleSource> {
    source: S,
    mode: ConnectionMode,
    settings: Settings,
    settings_store: SettingsStore,
    recordings: RecordingStore,
    live: LiveDashboard,
    calibration: CalibrationMonitor,
    session: RecordingSession,
    live_auto_update: bool,
    calibration_auto_update: bool,
    live_timer: Ticker,
    calibration_timer: Ticker,
    recording_timer: Ticker,
    outbox: Vec<EngineMessage>,
}
impl<S: SampleSource> Engine<S> {
    pub fn new(
        source: S,
        mode: ConnectionMode,
        settings_store: SettingsStore,
        recordings: RecordingStore,
        now: Instant,
    ) -> Self {
        let settings = settings_store.load_or_default();
        let live_period = Duration::from_secs(LIVE_TICK_SECS as u64);
        let mut engine = Self {
            mode,
            settings,
            settings_store,
            recordings,
            live: LiveDashboard::new(),
            calibration: CalibrationMonitor::new(),
            session: RecordingSession::new(),
            live_auto_update: false,
            calibration_auto_update: false,
            live_timer: Ticker::new(live_period, now),
            calibration_timer: Ticker::new(live_period, now),
            recording_timer: Ticker::new(recording_period(&settings), now),
            outbox: Vec::new(),
            source,
        };
        engine.log(format!("Core engine ready ({}).", engine.source.describe()));
        engine
    }
    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn live(&self) -> &LiveDashboard {
        &self.live
    }
    pub fn calibration(&self) -> &CalibrationMonitor {
        &self.calibration
    }
    pub fn session(&self) -> &RecordingSession {
        &self.session
    }
    pub fn recordings(&self) -> &RecordingStore {
        &self.recordings
    }
    pub fn live_auto_update(&self) -> bool {
        self.live_auto_update
    }
    pub fn calibration_auto_update(&self) -> bool {
        self.calibration_auto_update
    }
    /// Time until the next recorded sample, while recording.
    pub fn next_sample_in(&self, now: Instant) -> Option<Duration> {
        self.session
            .can_stop()
            .then(|| self.recording_timer.remaining(now))
    }
    pub fn drain_messages(&mut self) -> Vec<EngineMessage> {
        std::mem::take(&mut self.outbox)
    }
    fn log(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        info!("{msg}");
        self.outbox.push(EngineMessage::Log(msg));
    }
    fn dialog_error(&mut self, title: &str, err: &DashboardError) {
        warn!("{title}: {err}");
        self.outbox.push(EngineMessage::Error {
            title: title.to_owned(),
            body: format!("{title}: {err}"),
        });
    }
    fn rejected(&mut self, err: DashboardError) {
        self.log(format!("Ignored: {err}"));
    }
    pub fn handle(&mut self, cmd: GuiCommand, now: Instant, wall: DateTime<Local>) {
        match cmd {
            GuiCommand::SetLiveAutoUpdate(on) => self.live_auto_update = on,
            GuiCommand::ClearLive => self.live.clear(),
            GuiCommand::SetCalibrationAutoUpdate(on) => self.calibration_auto_update = on,
            GuiCommand::ClearCalibration => self.calibration.clear(),
            GuiCommand::StartRecording => match self.session.start(wall) {
                Ok(()) => {
                    self.recording_timer.restart(now);
                    self.log(format!(
                        "Recording started, one sample every {} min.",
                        self.settings.measurement_interval_min
                    ));
                }
                Err(e) => self.rejected(e),
            },
            GuiCommand::StopRecording => match self.session.stop(wall, &self.recordings) {
                Ok(StopOutcome::Saved(path)) => {
                    self.log(format!("Recording saved: {}", path.display()));
                    self.outbox.push(EngineMessage::Info {
                        title: "Recording saved".to_owned(),
                        body: format!("Recording was saved at: {}", path.display()),
                    });
                }
                Ok(StopOutcome::Discarded { samples }) => {
                    self.log(format!("Recording discarded ({samples} samples)."));
                    self.outbox.push(EngineMessage::Warning {
                        title: "Recording not saved".to_owned(),
                        body: "Recording was too short and not saved".to_owned(),
                    });
                }
                Err(e @ DashboardError::InvalidTransition { .. }) => self.rejected(e),
                Err(e) => self.dialog_error("Failed to save recording", &e),
            },
            GuiCommand::ClearRecording => {
                if let Err(e) = self.session.clear() {
                    self.rejected(e);
                }
            }
            GuiCommand::LoadRecording(path) => match self.session.load(&path, &self.recordings) {
                Ok(()) => self.log(format!(
                    "Loaded {} samples from {}",
                    self.session.samples().len(),
                    path.display()
                )),
                Err(e @ DashboardError::InvalidTransition { .. }) => self.rejected(e),
                Err(e) => self.dialog_error("Failed to load file", &e),
            },
            GuiCommand::ExportRecordingPng => self.export_png(),
            GuiCommand::SaveSettings(inputs) => self.save_settings(&inputs, now),
        }
    }
    fn export_png(&mut self) {
        let Some(target) = self.session.path().map(|p| p.with_extension("png")) else {
            self.rejected(DashboardError::InvalidTransition {
                state: self.session.state(),
                action: "export",
            });
            return;
        };
        let written = render_recording_png(&self.session, &self.settings, PlotStyle::default())
            .and_then(|png| {
                std::fs::write(&target, png).map_err(|e| DashboardError::io(&target, e))
            });
        match written {
            Ok(()) => {
                self.log(format!("Chart exported: {}", target.display()));
                self.outbox.push(EngineMessage::Info {
                    title: "Chart exported".to_owned(),
                    body: format!("Chart was saved at: {}", target.display()),
                });
            }
            Err(e) => self.dialog_error("Failed to export chart", &e),
        }
    }
    fn save_settings(&mut self, inputs: &[(SettingKey, String)], now: Instant) {
        let changed = self
            .settings
            .apply_inputs(inputs.iter().map(|(key, text)| (*key, text.as_str())));
        if changed.contains(&SettingKey::MeasurementInterval) {
            self.recording_timer
                .set_period(recording_period(&self.settings), now);
        }
        if let Err(e) = self.settings_store.save(&self.settings) {
            self.dialog_error("Failed to save settings", &e);
        } else {
            self.log(format!("Settings saved ({} changed).", changed.len()));
        }
        self.outbox
            .push(EngineMessage::SettingsChanged(self.settings));
    }
    /// Run whatever ticks are due.
    pub fn poll(&mut self, now: Instant, wall: DateTime<Local>) {
        if self.live_timer.due(now) && self.live_auto_update {
            if let Err(e) = self.live.tick(&mut self.source, &self.settings) {
                self.log(format!("Live update skipped: {e}"));
            }
        }
        if self.calibration_timer.due(now) && self.calibration_auto_update {
            if let Err(e) = self.calibration.tick(&mut self.source, &self.settings) {
                self.log(format!("Calibration update skipped: {e}"));
            }
        }
        if self.session.can_stop() && self.recording_timer.due(now) {
            self.record_measurement(wall);
        }
    }
    fn record_measurement(&mut self, wall: DateTime<Local>) {
        let ppm = match self
            .source
            .read_ppm(self.settings.v400, self.settings.v40000)
        {
            Ok(ppm) => ppm,
            Err(e) => {
                self.log(format!("Measurement skipped: {e}"));
                return;
            }
        };
        if let Err(e) = self.session.record(Sample {
            timestamp: wall,
            ppm,
        }) {
            self.rejected(e);
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ManualSource;
    use crate::recorder::SessionState;
    use chrono::TimeZone;
    struct Harness {
        engine: Engine<ManualSource>,
        t0: Instant,
        wall0: DateTime<Local>,
        _dir: tempfile::TempDir,
    }
    impl Harness {
        fn new(raws: &[i32]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let t0 = Instant::now();
            let engine = Engine::new(
                ManualSource::new(raws.iter().copied()),
                ConnectionMode::Simulation,
                SettingsStore::in_dir(dir.path()),
                RecordingStore::new(dir.path()),
                t0,
            );
            Self {
                engine,
                t0,
                wall0: Local.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
                _dir: dir,
            }
        }
        fn at(&self, secs: u64) -> (Instant, DateTime<Local>) {
            (
                self.t0 + Duration::from_secs(secs),
                self.wall0 + chrono::Duration::seconds(secs as i64),
            )
        }
        fn send(&mut self, cmd: GuiCommand, secs: u64) {
            let (now, wall) = self.at(secs);
            self.engine.handle(cmd, now, wall);
        }
        fn poll(&mut self, secs: u64) {
            let (now, wall) = self.at(secs);
            self.engine.poll(now, wall);
        }
        fn dialogs(&mut self) -> Vec<EngineMessage> {
            self.engine
                .drain_messages()
                .into_iter()
                .filter(|m| !matches!(m, EngineMessage::Log(_)))
                .collect()
        }
    }
    #[test]
    fn ticker_fires_once_per_period() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(5), t0);
        assert!(!ticker.due(t0 + Duration::from_secs(4)));
        assert!(ticker.due(t0 + Duration::from_secs(5)));
        assert!(!ticker.due(t0 + Duration::from_secs(6)));
        assert!(ticker.due(t0 + Duration::from_secs(23)));
        assert_eq!(
            ticker.remaining(t0 + Duration::from_secs(25)),
            Duration::from_secs(3)
        );
    }
    #[test]
    fn live_ticks_only_with_auto_update() {
        let mut h = Harness::new(&[4000, 3970]);
        h.poll(5);
        assert_eq!(h.engine.live().last_read(), None);
        h.send(GuiCommand::SetLiveAutoUpdate(true), 6);
        h.poll(7);
        assert_eq!(h.engine.live().last_read(), None);
        h.poll(10);
        assert_eq!(h.engine.live().last_read(), Some(400));
        h.poll(15);
        assert_eq!(h.engine.live().last_read(), Some(796));
        h.send(GuiCommand::ClearLive, 16);
        assert_eq!(h.engine.live().co2().latest(), 0);
    }
    #[test]
    fn recording_samples_every_interval_and_saves() {
        let mut h = Harness::new(&[4000, 3970, 3940]);
        h.send(GuiCommand::StartRecording, 10);
        assert_eq!(h.engine.session().state(), SessionState::Recording);
        h.poll(100);
        assert!(h.engine.session().samples().is_empty());
        h.poll(130);
        h.poll(250);
        h.poll(370);
        let ppms: Vec<i64> = h.engine.session().samples().iter().map(|s| s.ppm).collect();
        assert_eq!(ppms, vec![400, 796, 1192]);
        h.send(GuiCommand::StopRecording, 400);
        assert_eq!(h.engine.session().state(), SessionState::Loaded);
        let dialogs = h.dialogs();
        assert!(matches!(dialogs.as_slice(), [EngineMessage::Info { title, .. }] if title == "Recording saved"));
        assert!(h.engine.session().path().unwrap().exists());
    }
    #[test]
    fn measurements_are_taken_only_while_recording() {
        let mut h = Harness::new(&[4000, 3970, 3940]);
        for minute in 1..=10 {
            h.poll(minute * 60);
        }
        assert_eq!(h.engine.session().state(), SessionState::Clear);
        assert!(h.engine.session().samples().is_empty());
        h.send(GuiCommand::StartRecording, 600);
        h.poll(720);
        h.poll(840);
        h.send(GuiCommand::StopRecording, 850);
        assert_eq!(h.engine.session().state(), SessionState::Loaded);
        let kept: Vec<i64> = h.engine.session().samples().iter().map(|s| s.ppm).collect();
        assert_eq!(kept, vec![400, 796]);
        for minute in 15..=30 {
            h.poll(minute * 60);
        }
        let after: Vec<i64> = h.engine.session().samples().iter().map(|s| s.ppm).collect();
        assert_eq!(after, kept);
        // the third queued value was never read
        assert_eq!(h.engine.source.read_raw_adc().unwrap(), 3940);
        assert!(h.engine.source.read_raw_adc().is_err());
    }
    #[test]
    fn short_recording_warns_and_clears() {
        let mut h = Harness::new(&[4000]);
        h.send(GuiCommand::StartRecording, 0);
        h.poll(120);
        h.send(GuiCommand::StopRecording, 130);
        assert_eq!(h.engine.session().state(), SessionState::Clear);
        let dialogs = h.dialogs();
        assert!(matches!(dialogs.as_slice(), [EngineMessage::Warning { .. }]));
    }
    #[test]
    fn missing_file_reports_error_and_keeps_state() {
        let mut h = Harness::new(&[]);
        let path = h.engine.recordings().dir().join("missing.json");
        h.send(GuiCommand::LoadRecording(path), 0);
        assert_eq!(h.engine.session().state(), SessionState::Clear);
        let dialogs = h.dialogs();
        assert!(matches!(dialogs.as_slice(), [EngineMessage::Error { title, .. }] if title == "Failed to load file"));
    }
    #[test]
    fn invalid_commands_are_only_logged() {
        let mut h = Harness::new(&[]);
        h.send(GuiCommand::StopRecording, 0);
        h.send(GuiCommand::ClearRecording, 0);
        h.send(GuiCommand::ExportRecordingPng, 0);
        assert!(h.dialogs().is_empty());
        assert_eq!(h.engine.session().state(), SessionState::Clear);
    }
    #[test]
    fn saving_settings_persists_and_retimes_recording() {
        let mut h = Harness::new(&[4000, 4000]);
        h.send(
            GuiCommand::SaveSettings(vec![
                (SettingKey::MeasurementInterval, "1".to_owned()),
                (SettingKey::HighCo2, "oops".to_owned()),
            ]),
            0,
        );
        assert_eq!(h.engine.settings().measurement_interval_min, 1);
        assert_eq!(h.engine.settings().high_co2, 2000);
        let dialogs = h.dialogs();
        assert!(matches!(
            dialogs.as_slice(),
            [EngineMessage::SettingsChanged(s)] if s.measurement_interval_min == 1
        ));
        let reloaded = SettingsStore::in_dir(h.engine.recordings().dir()).load().unwrap();
        assert_eq!(reloaded.map(|s| s.measurement_interval_min), Some(1));
        h.send(GuiCommand::StartRecording, 0);
        h.poll(60);
        assert_eq!(h.engine.session().samples().len(), 1);
        assert_eq!(
            h.engine.next_sample_in(h.t0 + Duration::from_secs(70)),
            Some(Duration::from_secs(50))
        );
    }
}
