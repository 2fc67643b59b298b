// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub inference: InferenceConfig,
    pub smoothing: SmoothingConfig,
    pub video: VideoConfig,
    pub gps: GpsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub input_width: usize,
    pub input_height: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub generate_heatmap: bool,
    /// Heatmap weight in the overlay composite; the frame gets 1 - alpha.
    pub heatmap_alpha: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    pub method: String,
    pub window_size: usize,
    pub ema_alpha: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub transcode_h264: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// One decoded frame. `timestamp` is seconds from the start of the
/// container, derived as index / fps.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub timestamp: f64,
    /// RGB, HWC, row-major.
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Good,
    Bad,
}

impl Label {
    pub fn from_probability(prob: f32) -> Self {
        if prob > 0.5 {
            Label::Good
        } else {
            Label::Bad
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Good => "Good",
            Label::Bad => "Bad",
        }
    }
}

/// Raw per-frame classifier output, in decode order.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilitySample {
    pub index: usize,
    pub timestamp: f64,
    pub raw: f32,
}

/// Externally supplied geolocation sample. `highlight` is (re)computed by
/// the aligner once a run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: f64,
    pub highlight: Option<bool>,
}

/// Summary returned at job completion; the caller owns it thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceRun {
    pub output_video: String,
    pub heatmap_video: Option<String>,
    pub csv_output: String,
    pub created_at: String,
    pub timestamps: Vec<f64>,
    pub raw_probs: Vec<f32>,
    pub smoothed_probs: Vec<f32>,
}
