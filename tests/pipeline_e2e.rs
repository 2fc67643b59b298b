// End-to-end pipeline run over a synthetic clip with a scripted classifier.

use opencv::{
    core,
    prelude::*,
    videoio::{VideoWriter, VideoWriterTrait},
};
use roadgrade::classifier::Classifier;
use roadgrade::error::PipelineError;
use roadgrade::gradcam::Heatmap;
use roadgrade::pipeline;
use roadgrade::progress::{JobStatus, ProgressRegistry};
use roadgrade::types::{
    Config, GpsConfig, InferenceConfig, LoggingConfig, ModelConfig, SmoothingConfig, VideoConfig,
};
use std::path::Path;

struct ScriptedClassifier {
    probs: Vec<f32>,
    calls: usize,
}

impl ScriptedClassifier {
    fn alternating() -> Self {
        Self {
            probs: vec![0.9, 0.1],
            calls: 0,
        }
    }
}

impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn predict(&mut self, _input: &[f32]) -> Result<f32, PipelineError> {
        let prob = self.probs[self.calls % self.probs.len()];
        self.calls += 1;
        Ok(prob)
    }

    fn explain(&mut self, _input: &[f32]) -> Result<Heatmap, PipelineError> {
        Ok(Heatmap::zeros((4, 3)))
    }
}

fn write_synthetic_video(path: &Path, frames: usize, width: i32, height: i32) {
    let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G').expect("fourcc");
    let mut writer = VideoWriter::new(
        path.to_str().expect("utf8 path"),
        fourcc,
        10.0,
        core::Size::new(width, height),
        true,
    )
    .expect("create writer");

    for i in 0..frames {
        let shade = (40 + i * 20) as f64;
        let mat = core::Mat::new_rows_cols_with_default(
            height,
            width,
            core::CV_8UC3,
            core::Scalar::new(shade, 128.0, 64.0, 0.0),
        )
        .expect("frame mat");
        writer.write(&mat).expect("write frame");
    }
    writer.release().expect("release writer");
}

fn test_config(dir: &Path) -> Config {
    Config {
        model: ModelConfig {
            path: dir
                .join("missing_checkpoint.safetensors")
                .to_string_lossy()
                .into_owned(),
            input_width: 48,
            input_height: 64,
        },
        inference: InferenceConfig {
            generate_heatmap: false,
            heatmap_alpha: 0.4,
        },
        smoothing: SmoothingConfig {
            method: "moving_average".to_string(),
            window_size: 3,
            ema_alpha: 0.3,
        },
        video: VideoConfig {
            input_dir: dir.join("in").to_string_lossy().into_owned(),
            output_dir: dir.join("out").to_string_lossy().into_owned(),
            transcode_h264: false,
        },
        gps: GpsConfig { enabled: false },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

#[test]
fn ten_frame_run_matches_hand_computed_smoothing_and_csv() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input_dir = dir.path().join("in");
    std::fs::create_dir_all(&input_dir).expect("input dir");

    let video = input_dir.join("clip.avi");
    write_synthetic_video(&video, 10, 64, 48);

    let config = test_config(dir.path());
    let registry = ProgressRegistry::new();
    let mut classifier = ScriptedClassifier::alternating();

    let run = pipeline::run_inference(&config, &video, &mut classifier, &registry, "e2e")
        .expect("pipeline run");

    assert_eq!(run.raw_probs.len(), 10);
    assert_eq!(run.smoothed_probs.len(), 10);
    for (i, &raw) in run.raw_probs.iter().enumerate() {
        let expected = if i % 2 == 0 { 0.9 } else { 0.1 };
        assert!((raw - expected).abs() < 1e-6, "raw[{i}] = {raw}");
    }

    // moving_average(window = 3) over 0.9, 0.1, 0.9, 0.1, ...
    let odd = (0.9f32 + 0.1 + 0.9) / 3.0;
    let even = (0.1f32 + 0.9 + 0.1) / 3.0;
    let expected_smoothed: [f32; 10] = [
        0.9, 0.5, odd, even, odd, even, odd, even, odd, even,
    ];
    for (i, (&got, &want)) in run
        .smoothed_probs
        .iter()
        .zip(expected_smoothed.iter())
        .enumerate()
    {
        assert!((got - want).abs() < 1e-4, "smoothed[{i}]: {got} != {want}");
    }

    // Timestamps derive from index / fps at 10 fps.
    for (i, &ts) in run.timestamps.iter().enumerate() {
        assert!((ts - i as f64 / 10.0).abs() < 1e-9);
    }

    // CSV: ten rows, frame indices 0..9 in order, labels follow the
    // smoothed probabilities.
    let mut reader = csv::Reader::from_path(&run.csv_output).expect("open csv");
    let header = reader.headers().expect("headers").clone();
    assert_eq!(header.get(0), Some("Frame"));
    assert_eq!(header.get(4), Some("Predicted_Label"));

    let records: Vec<csv::StringRecord> = reader
        .records()
        .map(|r| r.expect("csv record"))
        .collect();
    assert_eq!(records.len(), 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.get(0), Some(i.to_string().as_str()));
        let expected_label = if expected_smoothed[i] > 0.5 { "Good" } else { "Bad" };
        assert_eq!(record.get(4), Some(expected_label));
    }

    // The annotated video exists; no heatmap video was requested.
    assert!(Path::new(&run.output_video).exists());
    assert!(run.heatmap_video.is_none());

    // One advance per frame; the registry reached 100% and is still in the
    // pre-terminal state (finish belongs to the submit boundary).
    let snapshot = registry.poll("e2e");
    assert_eq!(snapshot.percent, 100.0);
    assert_eq!(snapshot.status, JobStatus::Running);
}

#[tokio::test]
async fn missing_checkpoint_fails_the_job_with_error_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input_dir = dir.path().join("in");
    std::fs::create_dir_all(&input_dir).expect("input dir");

    let video = input_dir.join("clip.avi");
    write_synthetic_video(&video, 3, 64, 48);

    let config = test_config(dir.path());
    let registry = ProgressRegistry::new();

    let job = pipeline::submit(config, video, registry.clone());
    let result = job.handle.await.expect("job not panicked");
    assert!(result.is_err());

    match registry.poll(&job.job_id).status {
        JobStatus::Error(message) => {
            assert!(message.contains("checkpoint"), "unexpected message: {message}")
        }
        other => panic!("expected error status, got {other:?}"),
    }
}
