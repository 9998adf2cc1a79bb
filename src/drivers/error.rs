use std::path::PathBuf;
use thiserror::Error;
use crate::recorder::SessionState;
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("cannot {action} while the recording is {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },
    #[error("sample at {timestamp} is not after the previous sample")]
    OutOfOrderSample { timestamp: String },
    #[error("recording holds {count} samples, at least {required} are required")]
    TooFewSamples { count: usize, required: usize },
    #[error("unsupported recording format version {0}")]
    UnsupportedFormat(u32),
    #[error("file does not exist: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("sensor read failed: {0}")]
    Sensor(String),
    #[error("calibration anchors must differ (v400 = {v400}, v40000 = {v40000})")]
    Calibration { v400: u32, v40000: u32 },
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl DashboardError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DashboardError::Io {
            path: path.into(),
            source,
        }
    }
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        DashboardError::Json {
            path: path.into(),
            source,
        }
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for DashboardError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        DashboardError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for DashboardError {
    fn from(value: image::ImageError) -> Self {
        DashboardError::Plot(value.to_string())
    }
}
