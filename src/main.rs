// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod drivers;
mod engine;
mod gui;
mod recorder;
mod settings;
mod types;
mod visualizer;
use std::path::PathBuf;
use std::time::Instant;
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use log::info;
use drivers::{IioSource, SampleSource, SimulatedSource};
use engine::Engine;
use recorder::RecordingStore;
use settings::SettingsStore;
use types::ConnectionMode;
/// Overrides the directory holding settings and recordings.
const SAVE_DIR_ENV: &str = "CO2DASH_SAVE_DIR";
/// File with the sensor's raw ADC count; unset means simulation.
const ADC_PATH_ENV: &str = "CO2DASH_ADC_PATH";
// 默认保存目录：可执行文件旁的 saves/
fn save_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(SAVE_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => {
            let exe = std::env::current_exe().context("cannot locate executable")?;
            exe.parent()
                .ok_or_else(|| anyhow!("executable has no parent directory"))?
                .join("saves")
        }
    };
    if !dir.exists() {
        info!("saves directory not found, creating {}", dir.display());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }
    info!("using save directory {}", dir.display());
    Ok(dir)
}
fn open_sensor() -> (Box<dyn SampleSource>, ConnectionMode) {
    match std::env::var_os(ADC_PATH_ENV) {
        Some(path) => (Box::new(IioSource::new(path)), ConnectionMode::Hardware),
        None => (Box::new(SimulatedSource::default()), ConnectionMode::Simulation),
    }
}
// 入口函数
fn main() -> Result<()> {
    env_logger::init();
    let dir = save_dir()?;
    let (source, mode) = open_sensor();
    info!("sensor: {} ({:?})", source.describe(), mode);
    let engine = Engine::new(
        source,
        mode,
        SettingsStore::in_dir(&dir),
        RecordingStore::new(&dir),
        Instant::now(),
    );
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1400.0, 900.0])
        .with_min_inner_size([1000.0, 700.0])
        .with_title("CO2 Dashboard");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "CO2 Dashboard",
        options,
        Box::new(move |_cc| Box::new(gui::Co2DashboardApp::new(engine))),
    )
    .map_err(|e| anyhow!("ui terminated: {e}"))
}
