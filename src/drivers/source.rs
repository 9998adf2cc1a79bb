use std::collections::VecDeque;
use std::path::PathBuf;
use rand::Rng;
use crate::drivers::DashboardError;
pub const LOW_ANCHOR_PPM: f64 = 400.0;
pub const HIGH_ANCHOR_PPM: f64 = 40_000.0;
/// Linear interpolation through `(v400, 400 ppm)` and `(v40000, 40000 ppm)`.
pub fn linear_ppm(raw: i32, v400: u32, v40000: u32) -> Result<f64, DashboardError> {
    if v400 == v40000 {
        return Err(DashboardError::Calibration { v400, v40000 });
    }
    let slope = (HIGH_ANCHOR_PPM - LOW_ANCHOR_PPM) / (v40000 as f64 - v400 as f64);
    Ok(LOW_ANCHOR_PPM + (raw as f64 - v400 as f64) * slope)
}
/// Something wired to a CO2 sensor.
///
/// The raw-to-ppm mapping belongs to the sensor vendor, so it lives on the
/// source; the linear default only holds for sensors with a linear output.
pub trait SampleSource {
    fn read_raw_adc(&mut self) -> Result<i32, DashboardError>;
    fn raw_to_ppm(&self, raw: i32, v400: u32, v40000: u32) -> Result<f64, DashboardError> {
        linear_ppm(raw, v400, v40000)
    }
    fn read_ppm(&mut self, v400: u32, v40000: u32) -> Result<i64, DashboardError> {
        let raw = self.read_raw_adc()?;
        Ok(self.raw_to_ppm(raw, v400, v40000)?.round() as i64)
    }
    fn describe(&self) -> String;
}
impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_raw_adc(&mut self) -> Result<i32, DashboardError> {
        (**self).read_raw_adc()
    }
    fn raw_to_ppm(&self, raw: i32, v400: u32, v40000: u32) -> Result<f64, DashboardError> {
        (**self).raw_to_ppm(raw, v400, v40000)
    }
    fn describe(&self) -> String {
        (**self).describe()
    }
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<i32>,
}
impl ManualSource {
    pub fn new(raw_values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            queue: raw_values.into_iter().collect(),
        }
    }
}
impl SampleSource for ManualSource {
    fn read_raw_adc(&mut self) -> Result<i32, DashboardError> {
        self.queue
            .pop_front()
            .ok_or_else(|| DashboardError::Sensor("manual source exhausted".into()))
    }
    fn describe(&self) -> String {
        format!("manual ({} queued)", self.queue.len())
    }
}
/// Bounded random walk between the two calibration anchors, for running the
/// dashboard without a sensor attached.
pub struct SimulatedSource {
    raw: i32,
    min_raw: i32,
    max_raw: i32,
    max_step: i32,
}
impl SimulatedSource {
    pub fn new(start_raw: i32, min_raw: i32, max_raw: i32) -> Self {
        let (min_raw, max_raw) = (min_raw.min(max_raw), min_raw.max(max_raw));
        Self {
            raw: start_raw.clamp(min_raw, max_raw),
            min_raw,
            max_raw,
            max_step: ((max_raw - min_raw) / 200).max(1),
        }
    }
}
impl Default for SimulatedSource {
    fn default() -> Self {
        // ~800 ppm with the default anchors.
        Self::new(3970, 3000, 4000)
    }
}
impl SampleSource for SimulatedSource {
    fn read_raw_adc(&mut self) -> Result<i32, DashboardError> {
        let step = rand::thread_rng().gen_range(-self.max_step..=self.max_step);
        self.raw = (self.raw + step).clamp(self.min_raw, self.max_raw);
        Ok(self.raw)
    }
    fn describe(&self) -> String {
        "simulated sensor".to_owned()
    }
}
/// Reads the raw ADC count from a file published by an existing kernel driver,
/// e.g. `/sys/bus/iio/devices/iio:device0/in_voltage0_raw`.
pub struct IioSource {
    path: PathBuf,
}
impl IioSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}
impl SampleSource for IioSource {
    fn read_raw_adc(&mut self) -> Result<i32, DashboardError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| DashboardError::io(&self.path, e))?;
        text.trim().parse::<i32>().map_err(|e| {
            DashboardError::Sensor(format!("{}: {e} (read {:?})", self.path.display(), text.trim()))
        })
    }
    fn describe(&self) -> String {
        format!("ADC at {}", self.path.display())
    }
}
