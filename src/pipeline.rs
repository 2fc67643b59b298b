// src/pipeline.rs
//
// The end-to-end run for one video: an inference pass that accumulates the
// raw probability sequence, temporal smoothing, then an assembly pass that
// re-reads the container to render outputs against the smoothed labels.
// `submit` is the run boundary: every failure inside becomes an error
// progress status, never a silently stuck job.

use crate::annotate;
use crate::classifier::{Classifier, CnnClassifier};
use crate::error::PipelineError;
use crate::preprocessing;
use crate::progress::ProgressRegistry;
use crate::smoothing::Smoothing;
use crate::transcode;
use crate::types::{Config, InferenceRun, Label, ProbabilitySample};
use crate::video_processor::VideoProcessor;
use opencv::videoio::VideoWriterTrait;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const CSV_HEADER: [&str; 5] = [
    "Frame",
    "Timestamp_sec",
    "Raw_Probability",
    "Smoothed_Probability",
    "Predicted_Label",
];

/// Task handle for a submitted run. Progress is observed through the
/// registry; the handle resolves to the run summary.
pub struct JobHandle {
    pub job_id: String,
    pub handle: JoinHandle<Result<InferenceRun, PipelineError>>,
}

/// Offload one video run onto the blocking pool. The classifier is loaded
/// inside the job so a bad checkpoint surfaces as a failed job, not a
/// crashed submitter.
pub fn submit(config: Config, video_path: PathBuf, registry: ProgressRegistry) -> JobHandle {
    let job_id = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    registry.create(&job_id);

    let id = job_id.clone();
    let handle = tokio::task::spawn_blocking(move || {
        let result = CnnClassifier::load(&config.model).and_then(|mut classifier| {
            run_inference(&config, &video_path, &mut classifier, &registry, &id)
        });
        match result {
            Ok(run) => {
                registry.finish(&id);
                Ok(run)
            }
            Err(err) => {
                registry.fail(&id, err.to_string());
                Err(err)
            }
        }
    });

    JobHandle { job_id, handle }
}

pub fn run_inference(
    config: &Config,
    video_path: &Path,
    classifier: &mut dyn Classifier,
    registry: &ProgressRegistry,
    job_id: &str,
) -> Result<InferenceRun, PipelineError> {
    let processor = VideoProcessor::new(config.video.clone());
    let smoothing = Smoothing::from_config(&config.smoothing)?;
    let (in_w, in_h) = (config.model.input_width, config.model.input_height);

    // ── Pass 1: per-frame inference ──────────────────────────────────
    let mut reader = processor.open_video(video_path)?;
    registry.start(job_id, reader.total_frames.max(0) as u64);

    let mut samples: Vec<ProbabilitySample> = Vec::new();

    while let Some(frame) = reader.read_frame()? {
        let tensor =
            preprocessing::preprocess(&frame.data, frame.width, frame.height, in_w, in_h)?;
        let raw = classifier.predict(&tensor)?;
        samples.push(ProbabilitySample {
            index: frame.index,
            timestamp: frame.timestamp,
            raw,
        });
        registry.advance(job_id);
    }

    if (samples.len() as i64) < reader.total_frames {
        debug!(
            "Decoder delivered {} of {} reported frames",
            samples.len(),
            reader.total_frames
        );
    }
    info!(
        "Classified {} frame(s) with {}",
        samples.len(),
        classifier.name()
    );

    let raw_probs: Vec<f32> = samples.iter().map(|s| s.raw).collect();
    let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
    let smoothed_probs = smoothing.apply(&raw_probs);

    // ── Pass 2: assembly against the smoothed labels ─────────────────
    let outputs = processor.output_paths(video_path)?;
    let mut reader = processor.open_video(video_path)?;
    let mut writer =
        processor.create_writer(&outputs.video, reader.width, reader.height, reader.fps)?;
    let mut heatmap_writer = if config.inference.generate_heatmap {
        Some(processor.create_writer(&outputs.heatmap, reader.width, reader.height, reader.fps)?)
    } else {
        None
    };

    let mut csv = csv::Writer::from_path(&outputs.csv)?;
    csv.write_record(CSV_HEADER)?;

    while let Some(frame) = reader.read_frame()? {
        // The second decode must stay positionally aligned with pass 1.
        if frame.index >= samples.len() {
            break;
        }
        let sample = samples[frame.index];
        let smoothed = smoothed_probs[frame.index];
        let label = Label::from_probability(smoothed);

        let annotated = annotate::annotate_frame(&frame, label, smoothed)?;
        writer.write(&annotated)?;

        if let Some(ref mut heatmap_out) = heatmap_writer {
            let tensor =
                preprocessing::preprocess(&frame.data, frame.width, frame.height, in_w, in_h)?;
            let heatmap = classifier.explain(&tensor)?;
            let overlay = annotate::render_heatmap_overlay(
                &frame,
                &heatmap,
                config.inference.heatmap_alpha,
                label,
                smoothed,
            )?;
            heatmap_out.write(&overlay)?;
        }

        csv.write_record(&[
            sample.index.to_string(),
            format!("{:.2}", sample.timestamp),
            format!("{:.4}", sample.raw),
            format!("{:.4}", smoothed),
            label.as_str().to_string(),
        ])?;
    }

    csv.flush()?;
    writer.release()?;
    if let Some(ref mut heatmap_out) = heatmap_writer {
        heatmap_out.release()?;
    }

    if config.video.transcode_h264 {
        transcode::transcode_to_h264(&outputs.video);
        if heatmap_writer.is_some() {
            transcode::transcode_to_h264(&outputs.heatmap);
        }
    }

    let run = InferenceRun {
        output_video: outputs.video.to_string_lossy().into_owned(),
        heatmap_video: heatmap_writer
            .is_some()
            .then(|| outputs.heatmap.to_string_lossy().into_owned()),
        csv_output: outputs.csv.to_string_lossy().into_owned(),
        created_at: chrono::Utc::now().to_rfc3339(),
        timestamps,
        raw_probs,
        smoothed_probs,
    };

    std::fs::write(&outputs.summary, serde_json::to_string_pretty(&run)?)?;
    info!("💾 Run summary written to {}", outputs.summary.display());

    Ok(run)
}
