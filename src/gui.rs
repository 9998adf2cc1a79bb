// src/gui.rs
use std::time::{Duration, Instant};
use chrono::Local;
use eframe::egui;
use egui::{Color32, RichText};
use crate::drivers::plot::y_ceiling;
use crate::drivers::SampleSource;
use crate::engine::Engine;
use crate::recorder::{RecordingSession, RECORDING_EXTENSION};
use crate::settings::{SettingKey, Settings};
use crate::types::*;
use crate::visualizer::{
    alert_color, empty_plot, readout, series_plot, threshold_plot, trend_color, verdict,
};
const LIVE_Y_MAX: f64 = 8000.0;
const NO_RECORDING_HINT: &str = "Start or load a recording to gain average evaluation";
#[derive(PartialEq, Clone, Copy, Debug)]
enum Tab {
    Live,
    Recording,
    Options,
}
#[derive(Clone, Copy, Debug)]
enum DialogKind {
    Info,
    Warning,
    Error,
}
struct Dialog {
    kind: DialogKind,
    title: String,
    body: String,
}
pub struct Co2DashboardApp {
    engine: Engine<Box<dyn SampleSource>>,
    selected_tab: Tab,
    live_auto_update: bool,
    calibration_auto_update: bool,
    setting_inputs: Vec<(SettingKey, String)>,
    log_messages: Vec<String>,
    dialog: Option<Dialog>,
}
fn inputs_from(settings: &Settings) -> Vec<(SettingKey, String)> {
    SettingKey::ALL
        .iter()
        .map(|key| (*key, settings.get(*key).to_string()))
        .collect()
}
impl Co2DashboardApp {
    pub fn new(engine: Engine<Box<dyn SampleSource>>) -> Self {
        let mut app = Self {
            selected_tab: Tab::Live,
            live_auto_update: engine.live_auto_update(),
            calibration_auto_update: engine.calibration_auto_update(),
            setting_inputs: inputs_from(engine.settings()),
            log_messages: vec!["CO2 Dashboard ready.".to_owned()],
            dialog: None,
            engine,
        };
        app.pump_messages();
        app
    }
    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }
    fn pump_messages(&mut self) {
        for msg in self.engine.drain_messages() {
            match msg {
                EngineMessage::Log(s) => self.log(&s),
                EngineMessage::Info { title, body } => {
                    self.dialog = Some(Dialog { kind: DialogKind::Info, title, body })
                }
                EngineMessage::Warning { title, body } => {
                    self.dialog = Some(Dialog { kind: DialogKind::Warning, title, body })
                }
                EngineMessage::Error { title, body } => {
                    self.dialog = Some(Dialog { kind: DialogKind::Error, title, body })
                }
                EngineMessage::SettingsChanged(settings) => {
                    self.setting_inputs = inputs_from(&settings)
                }
            }
        }
    }
    fn dispatch(&mut self, commands: Vec<GuiCommand>) {
        for cmd in commands {
            self.engine.handle(cmd, Instant::now(), Local::now());
        }
        self.pump_messages();
    }
    fn live_tab(&mut self, ui: &mut egui::Ui, commands: &mut Vec<GuiCommand>) {
        let settings = *self.engine.settings();
        let live = self.engine.live();
        threshold_plot(
            ui,
            "live_co2",
            live.co2().points(),
            live.co2().stride_secs() as f64,
            LIVE_Y_MAX,
            &settings,
            300.0,
        );
        ui.label("Time (s)");
        ui.separator();
        let summary = live.summary(&settings);
        let delta_points = live.delta().points();
        let window_minutes = live.co2().span_secs() / 60;
        ui.columns(2, |cols| {
            series_plot(&mut cols[0], "live_delta", delta_points, "Δ CO2 (ppm)", true, 180.0);
            let ui = &mut cols[1];
            ui.label(format!("Averages over the last {} minutes", window_minutes));
            readout(ui, "Average CO2 (in ppm):", summary.avg_co2);
            verdict(ui, summary.alert.text(), Some(alert_color(summary.alert)));
            readout(ui, "Average ΔCO2 (in ppm/step):", summary.avg_delta);
            verdict(ui, summary.trend.text(), Some(trend_color(summary.trend)));
            ui.add_space(10.0);
            if ui.checkbox(&mut self.live_auto_update, "Auto-Update").changed() {
                commands.push(GuiCommand::SetLiveAutoUpdate(self.live_auto_update));
            }
            if ui.button("Clear").clicked() {
                commands.push(GuiCommand::ClearLive);
            }
        });
    }
    fn recording_charts(ui: &mut egui::Ui, session: &RecordingSession, settings: &Settings) {
        let samples = session.samples();
        if samples.len() >= 2 {
            let points: Vec<[f64; 2]> = samples
                .iter()
                .map(|s| [session.elapsed_minutes(s.timestamp), s.ppm as f64])
                .collect();
            let max = samples.iter().map(|s| s.ppm).max().unwrap_or(0);
            threshold_plot(
                ui,
                "recording_co2",
                points,
                settings.measurement_interval_min as f64,
                y_ceiling(max, settings) as f64,
                settings,
                300.0,
            );
        } else {
            empty_plot(ui, "recording_co2", 300.0);
        }
        ui.label("Time (min since first sample)");
    }
    fn recording_tab(&mut self, ui: &mut egui::Ui, commands: &mut Vec<GuiCommand>) {
        let settings = *self.engine.settings();
        let session = self.engine.session();
        Self::recording_charts(ui, session, &settings);
        ui.separator();
        let delta_points: Vec<[f64; 2]> = match session.mean_delta() {
            Some(_) => session
                .deltas()
                .iter()
                .map(|d| [session.elapsed_minutes(d.timestamp), d.delta as f64])
                .collect(),
            None => Vec::new(),
        };
        let next_sample = self.engine.next_sample_in(Instant::now());
        ui.columns(3, |cols| {
            if delta_points.is_empty() {
                empty_plot(&mut cols[0], "recording_delta", 180.0);
            } else {
                series_plot(&mut cols[0], "recording_delta", delta_points, "Δ CO2 (ppm)", true, 180.0);
            }
            let ui = &mut cols[1];
            match session.mean() {
                Some(avg) => {
                    let level = AlertLevel::classify(avg, &settings);
                    readout(ui, "Average CO2 (in ppm):", avg);
                    verdict(ui, level.text(), Some(alert_color(level)));
                }
                None => {
                    readout(ui, "Average CO2 (in ppm):", 0);
                    verdict(ui, NO_RECORDING_HINT, None);
                }
            }
            match session.mean_delta() {
                Some(avg) => {
                    let trend = Trend::classify(avg);
                    readout(ui, "Average ΔCO2 (in ppm/step):", avg);
                    verdict(ui, trend.text(), Some(trend_color(trend)));
                }
                None => {
                    readout(ui, "Average ΔCO2 (in ppm/step):", 0);
                    verdict(ui, NO_RECORDING_HINT, None);
                }
            }
            ui.add_space(10.0);
            ui.label(format!("State: {}", session.state()));
            if let Some(start) = session.started_at() {
                ui.label(format!("Started: {}", start.format("%Y-%m-%d %H:%M")));
            }
            if let Some(end) = session.ended_at() {
                ui.label(format!("Ended: {}", end.format("%Y-%m-%d %H:%M")));
            }
            if let Some(path) = session.path() {
                ui.label(RichText::new(path.display().to_string()).small());
            }
            if let Some(left) = next_sample {
                ui.label(
                    RichText::new(format!("Recording... next sample in {} s", left.as_secs()))
                        .color(Color32::RED)
                        .small(),
                );
            }
            let ui = &mut cols[2];
            if ui.add_enabled(session.can_clear(), egui::Button::new("Clear")).clicked() {
                commands.push(GuiCommand::ClearRecording);
            }
            if ui.add_enabled(session.can_load(), egui::Button::new("Load")).clicked() {
                let picked = rfd::FileDialog::new()
                    .set_title("Select file")
                    .set_directory(self.engine.recordings().dir())
                    .add_filter("recordings", &[RECORDING_EXTENSION])
                    .pick_file();
                if let Some(path) = picked {
                    commands.push(GuiCommand::LoadRecording(path));
                }
            }
            if ui
                .add_enabled(session.can_start(), egui::Button::new("Start Recording"))
                .clicked()
            {
                commands.push(GuiCommand::StartRecording);
            }
            if ui
                .add_enabled(session.can_stop(), egui::Button::new("End Recording & Save"))
                .clicked()
            {
                commands.push(GuiCommand::StopRecording);
            }
            let can_export = session.can_clear() && session.path().is_some();
            if ui.add_enabled(can_export, egui::Button::new("Export PNG")).clicked() {
                commands.push(GuiCommand::ExportRecordingPng);
            }
        });
    }
    fn options_tab(&mut self, ui: &mut egui::Ui, commands: &mut Vec<GuiCommand>) {
        let raw_points = self.engine.calibration().raw().points();
        let current = self.engine.calibration().readout();
        ui.columns(2, |cols| {
            series_plot(&mut cols[0], "raw_adc", raw_points, "Raw (Digitalised)", false, 420.0);
            cols[0].label("Time (s)");
            let ui = &mut cols[1];
            egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                for (key, text) in &mut self.setting_inputs {
                    ui.label(key.label());
                    ui.add(egui::TextEdit::singleline(text).desired_width(80.0));
                    ui.end_row();
                }
            });
            if ui.button("Save").clicked() {
                commands.push(GuiCommand::SaveSettings(self.setting_inputs.clone()));
            }
            ui.separator();
            readout(ui, "Current Sensor Raw:", current.raw);
            readout(ui, "Corresponding ppm value:", current.ppm);
            if ui
                .checkbox(&mut self.calibration_auto_update, "Auto-Update")
                .changed()
            {
                commands.push(GuiCommand::SetCalibrationAutoUpdate(self.calibration_auto_update));
            }
            if ui.button("Clear Graph").clicked() {
                commands.push(GuiCommand::ClearCalibration);
            }
        });
    }
    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else {
            return;
        };
        let color = match dialog.kind {
            DialogKind::Info => Color32::LIGHT_BLUE,
            DialogKind::Warning => Color32::YELLOW,
            DialogKind::Error => Color32::RED,
        };
        let mut close = false;
        egui::Window::new(dialog.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(&dialog.body).color(color));
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
        if close {
            self.dialog = None;
        }
    }
}
impl eframe::App for Co2DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 计时器驱动的采样
        self.engine.poll(Instant::now(), Local::now());
        self.pump_messages();
        ctx.request_repaint_after(Duration::from_millis(500));
        // 2. UI 绘制
        let mut commands = Vec::new();
        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.selected_tab, Tab::Live, "Live Dashboard");
                ui.selectable_value(&mut self.selected_tab, Tab::Recording, "Recording");
                ui.selectable_value(&mut self.selected_tab, Tab::Options, "Options & Calibration");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mode = match self.engine.mode() {
                        ConnectionMode::Simulation => RichText::new("SIM").color(Color32::YELLOW),
                        ConnectionMode::Hardware => RichText::new("REAL").color(Color32::GREEN),
                    };
                    ui.label(mode);
                });
            });
        });
        egui::TopBottomPanel::bottom("log").show(ctx, |ui| {
            egui::ScrollArea::vertical().max_height(100.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });
        egui::CentralPanel::default().show(ctx, |ui| match self.selected_tab {
            Tab::Live => self.live_tab(ui, &mut commands),
            Tab::Recording => self.recording_tab(ui, &mut commands),
            Tab::Options => self.options_tab(ui, &mut commands),
        });
        self.show_dialog(ctx);
        if !commands.is_empty() {
            self.dispatch(commands);
        }
    }
}
