// src/drivers/mod.rs
// 采样、缓冲与绘图相关的子模块
pub mod buffer;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod source;
// 公开导出常用类型，方便外部调用
pub use buffer::RollingBuffer;
pub use error::DashboardError;
pub use pipeline::{CalibrationMonitor, LiveDashboard, LiveSummary, RawReadout};
pub use plot::{render_recording_png, PlotStyle};
pub use source::{IioSource, ManualSource, SampleSource, SimulatedSource};
