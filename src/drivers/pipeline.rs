use crate::drivers::error::DashboardError;
use crate::drivers::source::SampleSource;
use crate::drivers::RollingBuffer;
use crate::settings::Settings;
use crate::types::{AlertLevel, Trend};
/// Seconds between two live readings.
pub const LIVE_TICK_SECS: u32 = 5;
/// History shown on the CO2 chart (x from -600 s to 0 s).
pub const CO2_WINDOW_SECS: u32 = 600;
/// History shown on the delta and raw charts.
pub const DELTA_WINDOW_SECS: u32 = 300;
fn window_buffer(window_secs: u32) -> RollingBuffer {
    // one slot per tick, both ends of the window included
    RollingBuffer::new(window_secs + 1, LIVE_TICK_SECS)
}
/// Averages and verdicts derived from the live buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveSummary {
    pub avg_co2: i64,
    pub avg_delta: i64,
    pub alert: AlertLevel,
    pub trend: Trend,
}
/// Rolling CO2 and CO2-delta history for the live tab.
pub struct LiveDashboard {
    co2: RollingBuffer,
    delta: RollingBuffer,
    last_read: Option<i64>,
}
impl Default for LiveDashboard {
    fn default() -> Self {
        Self::new()
    }
}
impl LiveDashboard {
    pub fn new() -> Self {
        Self {
            co2: window_buffer(CO2_WINDOW_SECS),
            delta: window_buffer(DELTA_WINDOW_SECS),
            last_read: None,
        }
    }
    pub fn co2(&self) -> &RollingBuffer {
        &self.co2
    }
    pub fn delta(&self) -> &RollingBuffer {
        &self.delta
    }
    pub fn last_read(&self) -> Option<i64> {
        self.last_read
    }
    /// Feed one ppm reading.
    ///
    /// The first reading after start or a clear has no predecessor, so the
    /// delta window keeps its zero-filled slot instead of taking `ppm - 0`.
    pub fn push(&mut self, ppm: i64) {
        self.co2.append(ppm);
        if let Some(previous) = self.last_read {
            self.delta.append(ppm - previous);
        }
        self.last_read = Some(ppm);
    }
    pub fn tick<S: SampleSource>(
        &mut self,
        source: &mut S,
        settings: &Settings,
    ) -> Result<i64, DashboardError> {
        let ppm = source.read_ppm(settings.v400, settings.v40000)?;
        self.push(ppm);
        Ok(ppm)
    }
    pub fn clear(&mut self) {
        self.co2.clear();
        self.delta.clear();
        self.last_read = None;
    }
    pub fn summary(&self, settings: &Settings) -> LiveSummary {
        let avg_co2 = self.co2.mean();
        let avg_delta = self.delta.mean();
        LiveSummary {
            avg_co2,
            avg_delta,
            alert: AlertLevel::classify(avg_co2, settings),
            trend: Trend::classify(avg_delta),
        }
    }
}
/// Raw value and the ppm it maps to, taken from the same read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawReadout {
    pub raw: i32,
    pub ppm: i64,
}
/// Raw ADC history for the calibration tab.
pub struct CalibrationMonitor {
    raw: RollingBuffer,
    readout: RawReadout,
}
impl Default for CalibrationMonitor {
    fn default() -> Self {
        Self::new()
    }
}
impl CalibrationMonitor {
    pub fn new() -> Self {
        Self {
            raw: window_buffer(DELTA_WINDOW_SECS),
            readout: RawReadout::default(),
        }
    }
    pub fn raw(&self) -> &RollingBuffer {
        &self.raw
    }
    pub fn readout(&self) -> RawReadout {
        self.readout
    }
    pub fn tick<S: SampleSource>(
        &mut self,
        source: &mut S,
        settings: &Settings,
    ) -> Result<RawReadout, DashboardError> {
        let raw = source.read_raw_adc()?;
        self.raw.append(raw as i64);
        let ppm = source
            .raw_to_ppm(raw, settings.v400, settings.v40000)?
            .round() as i64;
        self.readout = RawReadout { raw, ppm };
        Ok(self.readout)
    }
    pub fn clear(&mut self) {
        self.raw.clear();
    }
}
