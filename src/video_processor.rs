// src/video_processor.rs

use crate::error::PipelineError;
use crate::types::{Frame, VideoConfig};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTraitConst, VideoWriter},
};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

pub struct VideoProcessor {
    config: VideoConfig,
}

/// Artifact locations for one run, all under the configured output dir.
pub struct OutputPaths {
    pub video: PathBuf,
    pub heatmap: PathBuf,
    pub csv: PathBuf,
    pub summary: PathBuf,
}

impl VideoProcessor {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn find_video_files(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut videos = Vec::new();

        for entry in WalkDir::new(&self.config.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_video = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    matches!(
                        ext.to_ascii_lowercase().as_str(),
                        "mp4" | "avi" | "mov" | "mkv"
                    )
                })
                .unwrap_or(false);
            if is_video {
                videos.push(path.to_path_buf());
            }
        }

        videos.sort();
        info!("Found {} video files", videos.len());
        Ok(videos)
    }

    pub fn open_video(&self, path: &Path) -> Result<VideoReader, PipelineError> {
        info!("Opening video: {}", path.display());

        let open_err = |reason: &str| PipelineError::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let path_str = path.to_str().ok_or_else(|| open_err("non-utf8 path"))?;
        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;

        if !cap.is_opened()? {
            return Err(open_err("container unreadable or codec unsupported"));
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i64;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        if fps <= 0.0 {
            return Err(open_err("container reports no frame rate"));
        }

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(VideoReader {
            cap,
            fps,
            total_frames,
            width,
            height,
            next_index: 0,
        })
    }

    pub fn output_paths(&self, input: &Path) -> Result<OutputPaths, PipelineError> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video");
        let dir = Path::new(&self.config.output_dir);

        Ok(OutputPaths {
            video: dir.join(format!("{stem}_inference.mp4")),
            heatmap: dir.join(format!("{stem}_heatmap.mp4")),
            csv: dir.join(format!("{stem}_predictions.csv")),
            summary: dir.join(format!("{stem}_run.json")),
        })
    }

    pub fn create_writer(
        &self,
        output_path: &Path,
        width: i32,
        height: i32,
        fps: f64,
    ) -> Result<VideoWriter, PipelineError> {
        info!("Output video: {}", output_path.display());

        let path_str = output_path.to_str().ok_or_else(|| PipelineError::Open {
            path: output_path.to_path_buf(),
            reason: "non-utf8 output path".to_string(),
        })?;

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            fps,
            core::Size::new(width, height),
            true,
        )?;

        Ok(writer)
    }
}

/// Lazy, ordered, single-pass frame sequence over one container. The
/// reported total may overstate what the decoder can deliver; a `None`
/// from `read_frame` is the normal end of the sequence either way.
pub struct VideoReader {
    cap: VideoCapture,
    pub fps: f64,
    pub total_frames: i64,
    pub width: i32,
    pub height: i32,
    next_index: usize,
}

impl VideoReader {
    pub fn read_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        use opencv::videoio::VideoCaptureTrait;

        let mut mat = Mat::default();

        if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? || mat.empty() {
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        let timestamp = index as f64 / self.fps;

        let mut rgb_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;

        let data = rgb_mat.data_bytes()?.to_vec();

        Ok(Some(Frame {
            index,
            timestamp,
            data,
            width: self.width as usize,
            height: self.height as usize,
        }))
    }

    /// Frames delivered so far.
    pub fn delivered(&self) -> usize {
        self.next_index
    }
}
