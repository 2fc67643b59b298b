// src/align.rs

use crate::error::PipelineError;
use crate::types::GeoPoint;
use std::path::Path;
use tracing::info;

/// Set each point's highlight flag from the probability of its nearest frame.
///
/// Nearest is by absolute timestamp distance; ties keep the lowest frame
/// index. Smoothed probabilities win over raw ones when supplied. In-place
/// and idempotent; empty timestamp sequences leave the points untouched.
pub fn align(
    points: &mut [GeoPoint],
    timestamps: &[f64],
    raw_probs: &[f32],
    smoothed_probs: Option<&[f32]>,
) {
    if timestamps.is_empty() {
        return;
    }
    let probs = smoothed_probs.unwrap_or(raw_probs);

    for point in points.iter_mut() {
        let mut best = 0usize;
        let mut best_dist = (timestamps[0] - point.timestamp).abs();
        for (i, &ts) in timestamps.iter().enumerate().skip(1) {
            let dist = (ts - point.timestamp).abs();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        point.highlight = Some(probs[best] > 0.5);
    }
}

pub fn load_geo_csv(path: &Path) -> Result<Vec<GeoPoint>, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut points = Vec::new();
    for record in reader.deserialize() {
        let point: GeoPoint = record?;
        points.push(point);
    }
    Ok(points)
}

pub fn write_geo_csv(path: &Path, points: &[GeoPoint]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    info!("Updated {} GPS point(s) in {}", points.len(), path.display());
    Ok(())
}
