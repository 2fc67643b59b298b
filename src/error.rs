// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot open video {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("failed to load model checkpoint {}: {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },

    #[error("no gradient captured for the target layer")]
    MissingGradient,

    #[error("invalid smoothing method {0:?} (expected moving_average, ema or none)")]
    InvalidSmoothing(String),

    #[error(transparent)]
    Video(#[from] opencv::Error),

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
