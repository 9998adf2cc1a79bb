// src/visualizer.rs
use crate::settings::Settings;
use crate::types::{AlertLevel, Trend};
use eframe::egui;
use egui::{Color32, RichText, Stroke, Vec2};
use egui_plot::{Bar, BarChart, HLine, Legend, Line, LineStyle, Plot, PlotPoints};
pub const ORANGE: Color32 = Color32::from_rgb(255, 165, 0);
pub const LIGHT_GREEN: Color32 = Color32::from_rgb(144, 238, 144);
pub const LIGHT_BLUE: Color32 = Color32::from_rgb(173, 216, 230);
const SERIES: Color32 = Color32::from_rgb(31, 119, 180);
pub fn alert_color(level: AlertLevel) -> Color32 {
    match level {
        AlertLevel::Low => LIGHT_GREEN,
        AlertLevel::Normal => Color32::from_rgb(0, 160, 0),
        AlertLevel::High => ORANGE,
        AlertLevel::VeryHigh => Color32::RED,
    }
}
pub fn trend_color(trend: Trend) -> Color32 {
    match trend {
        Trend::Increasing => ORANGE,
        Trend::Stable => LIGHT_BLUE,
        Trend::Decreasing => Color32::from_rgb(0, 160, 0),
    }
}
/// Small filled circle in front of a verdict text.
pub fn draw_status_lamp(ui: &mut egui::Ui, fill: Color32) {
    let (response, painter) = ui.allocate_painter(Vec2::splat(16.0), egui::Sense::hover());
    let center = response.rect.center();
    painter.circle_filled(center, 6.0, fill);
    painter.circle_stroke(center, 6.0, Stroke::new(1.0, Color32::from_rgb(60, 60, 60)));
}
pub fn verdict(ui: &mut egui::Ui, text: &str, fill: Option<Color32>) {
    ui.horizontal(|ui| {
        match fill {
            Some(fill) => {
                draw_status_lamp(ui, fill);
                ui.label(RichText::new(text).background_color(fill).color(Color32::BLACK));
            }
            None => {
                ui.label(text);
            }
        }
    });
}
/// Read-only "label: value" row.
pub fn readout(ui: &mut egui::Ui, label: &str, value: impl ToString) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.monospace(value.to_string());
    });
}
fn shading(points: &[[f64; 2]], above: u32, top: f64, width: f64, color: Color32) -> BarChart {
    let bars: Vec<Bar> = points
        .iter()
        .filter(|p| p[1] > above as f64)
        .map(|p| Bar::new(p[0], top).width(width).fill(color.linear_multiply(0.3)))
        .collect();
    BarChart::new(bars).color(color)
}
/// CO2 series with the three threshold lines and shaded high / very-high regions.
pub fn threshold_plot(
    ui: &mut egui::Ui,
    id: &str,
    points: Vec<[f64; 2]>,
    bar_width: f64,
    y_max: f64,
    settings: &Settings,
    height: f32,
) {
    Plot::new(id)
        .height(height)
        .legend(Legend::default())
        .include_y(0.0)
        .include_y(y_max)
        .allow_drag(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(shading(&points, settings.high_co2, y_max, bar_width, ORANGE));
            plot_ui.bar_chart(shading(&points, settings.very_high_co2, y_max, bar_width, Color32::RED));
            plot_ui.hline(
                HLine::new(settings.very_high_co2 as f64)
                    .color(Color32::RED)
                    .style(LineStyle::Solid)
                    .name("very high"),
            );
            plot_ui.hline(
                HLine::new(settings.high_co2 as f64)
                    .color(ORANGE)
                    .style(LineStyle::dashed_loose())
                    .name("high"),
            );
            plot_ui.hline(
                HLine::new(settings.low_co2 as f64)
                    .color(Color32::from_rgb(0, 160, 0))
                    .style(LineStyle::dashed_loose())
                    .name("normal"),
            );
            plot_ui.line(Line::new(PlotPoints::new(points)).color(SERIES).name("CO2"));
        });
}
/// Plain series, optionally with a grey line at zero (used for deltas).
pub fn series_plot(
    ui: &mut egui::Ui,
    id: &str,
    points: Vec<[f64; 2]>,
    name: &str,
    zero_line: bool,
    height: f32,
) {
    Plot::new(id)
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            if zero_line {
                plot_ui.hline(HLine::new(0.0).color(Color32::GRAY));
            }
            plot_ui.line(Line::new(PlotPoints::new(points)).color(SERIES).name(name));
        });
}
/// Placeholder shown in place of a chart that has too little data.
pub fn empty_plot(ui: &mut egui::Ui, id: &str, height: f32) {
    series_plot(ui, id, vec![[0.0, 0.0], [1.0, 0.0]], "", false, height);
}
