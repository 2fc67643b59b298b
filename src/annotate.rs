// src/annotate.rs
//
// Frame rendering for the output videos: label stamping on the annotated
// stream, colorized heatmap compositing on the explanation stream.

use crate::error::PipelineError;
use crate::gradcam::Heatmap;
use crate::types::{Frame, Label};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

/// Rebuild the frame as a BGR mat and stamp the predicted label on it.
pub fn annotate_frame(frame: &Frame, label: Label, prob: f32) -> Result<Mat, PipelineError> {
    let mut bgr = frame_to_bgr(frame)?;
    draw_label(&mut bgr, label, prob)?;
    Ok(bgr)
}

/// Resize the heatmap to frame resolution, map it through the jet palette
/// and composite it over the frame, label stamped on top.
pub fn render_heatmap_overlay(
    frame: &Frame,
    heatmap: &Heatmap,
    alpha: f64,
    label: Label,
    prob: f32,
) -> Result<Mat, PipelineError> {
    let (map_h, _map_w) = heatmap.dim();
    let bytes: Vec<u8> = heatmap
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
        .collect();

    let small = Mat::from_slice(&bytes)?;
    let small = small.reshape(1, map_h as i32)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &small,
        &mut resized,
        core::Size::new(frame.width as i32, frame.height as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut colored = Mat::default();
    imgproc::apply_color_map(&resized, &mut colored, imgproc::COLORMAP_JET)?;

    let bgr = frame_to_bgr(frame)?;
    let mut overlay = Mat::default();
    core::add_weighted(&bgr, 1.0 - alpha, &colored, alpha, 0.0, &mut overlay, -1)?;

    draw_label(&mut overlay, label, prob)?;
    Ok(overlay)
}

fn frame_to_bgr(frame: &Frame) -> Result<Mat, PipelineError> {
    let mat = Mat::from_slice(&frame.data)?;
    let mat = mat.reshape(3, frame.height as i32)?;

    let mut bgr = Mat::default();
    imgproc::cvt_color(&mat, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn draw_label(mat: &mut Mat, label: Label, prob: f32) -> Result<(), PipelineError> {
    // BGR: green for Good, red for Bad.
    let color = match label {
        Label::Good => core::Scalar::new(0.0, 255.0, 0.0, 0.0),
        Label::Bad => core::Scalar::new(0.0, 0.0, 255.0, 0.0),
    };

    imgproc::put_text(
        mat,
        &format!("{} ({:.2})", label.as_str(), prob),
        core::Point::new(30, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        color,
        2,
        imgproc::LINE_8,
        false,
    )?;

    Ok(())
}
