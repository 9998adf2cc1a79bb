// src/types.rs
use std::path::PathBuf;
use crate::settings::{SettingKey, Settings};
/// Average delta (ppm per step) beyond which CO2 counts as rising or falling.
pub const TREND_THRESHOLD_PPM: i64 = 200;
// 传感器来源
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}
// GUI 发给引擎的命令
#[derive(Clone, Debug)]
pub enum GuiCommand {
    SetLiveAutoUpdate(bool),
    ClearLive,
    SetCalibrationAutoUpdate(bool),
    ClearCalibration,
    StartRecording,
    StopRecording,
    ClearRecording,
    LoadRecording(PathBuf),
    ExportRecordingPng,
    SaveSettings(Vec<(SettingKey, String)>),
}
// 引擎发给 GUI 的消息
#[derive(Clone, Debug, PartialEq)]
pub enum EngineMessage {
    Log(String),
    Info { title: String, body: String },
    Warning { title: String, body: String },
    Error { title: String, body: String },
    SettingsChanged(Settings),
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertLevel {
    Low,
    Normal,
    High,
    VeryHigh,
}
impl AlertLevel {
    pub fn classify(avg_ppm: i64, settings: &Settings) -> Self {
        if avg_ppm <= settings.low_co2 as i64 {
            AlertLevel::Low
        } else if avg_ppm >= settings.very_high_co2 as i64 {
            AlertLevel::VeryHigh
        } else if avg_ppm >= settings.high_co2 as i64 {
            AlertLevel::High
        } else {
            AlertLevel::Normal
        }
    }
    pub fn text(self) -> &'static str {
        match self {
            AlertLevel::Low => "Average CO2 is low",
            AlertLevel::Normal => "Average CO2 is normal",
            AlertLevel::High => "Average CO2 is high",
            AlertLevel::VeryHigh => "Average CO2 is very high",
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}
impl Trend {
    pub fn classify(avg_delta: i64) -> Self {
        if avg_delta >= TREND_THRESHOLD_PPM {
            Trend::Increasing
        } else if avg_delta <= -TREND_THRESHOLD_PPM {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
    pub fn text(self) -> &'static str {
        match self {
            Trend::Increasing => "Average CO2 is increasing",
            Trend::Stable => "Average CO2 is (almost) stable",
            Trend::Decreasing => "Average CO2 is decreasing",
        }
    }
}
