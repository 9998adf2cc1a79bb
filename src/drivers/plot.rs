use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::DashboardError;
use crate::recorder::RecordingSession;
use crate::settings::Settings;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub series: RGBColor,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1500,
            height: 400,
            background: RGBColor(255, 255, 255),
            series: RGBColor(31, 119, 180),
        }
    }
}
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const THRESHOLD_GREEN: RGBColor = RGBColor(0, 128, 0);
/// Upper y bound: 10% headroom over the data, never below the very-high line.
pub fn y_ceiling(max_ppm: i64, settings: &Settings) -> f32 {
    (max_ppm as f32 * 1.1).max(settings.very_high_co2 as f32 * 1.1)
}
pub fn render_recording_png(
    session: &RecordingSession,
    settings: &Settings,
    style: PlotStyle,
) -> Result<Vec<u8>, DashboardError> {
    let samples = session.samples();
    if samples.len() < 2 {
        return Err(DashboardError::Plot(
            "recording needs at least two samples".into(),
        ));
    }
    let points: Vec<(f32, f32)> = samples
        .iter()
        .map(|s| (session.elapsed_minutes(s.timestamp) as f32, s.ppm as f32))
        .collect();
    let x_max = points.last().map(|p| p.0).unwrap_or(0.0).max(1.0 / 60.0);
    let y_max = y_ceiling(samples.iter().map(|s| s.ppm).max().unwrap_or(0), settings);
    let caption = match session.started_at() {
        Some(start) => format!("CO2 recording from {}", start.format("%Y-%m-%d %H:%M")),
        None => "CO2 recording".to_owned(),
    };
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(caption, ("sans-serif", 20).into_font())
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(0f32..x_max, 0f32..y_max)?;
        chart
            .configure_mesh()
            .x_desc("minutes since start")
            .y_desc("CO2 (ppm)")
            .light_line_style(&BLACK.mix(0.05))
            .draw()?;
        let series = style.series;
        chart
            .draw_series(LineSeries::new(points.iter().copied(), &series))?
            .label("CO2")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &series));
        for (value, color, label) in [
            (settings.very_high_co2, RED, "Very High"),
            (settings.high_co2, ORANGE, "High"),
            (settings.low_co2, THRESHOLD_GREEN, "Normal"),
        ] {
            let y = value as f32;
            chart
                .draw_series(LineSeries::new([(0.0, y), (x_max, y)], &color))?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&BLACK.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DashboardError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| DashboardError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
