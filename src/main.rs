// src/main.rs

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use roadgrade::align;
use roadgrade::pipeline;
use roadgrade::progress::{JobStatus, ProgressRegistry};
use roadgrade::types::{Config, InferenceRun};
use roadgrade::video_processor::VideoProcessor;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn inference_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:<20} {bar:40.cyan/blue} {percent:>3}% [{elapsed_precise}] {msg}",
    )
    .expect("invalid progress bar template")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("roadgrade={}", config.logging.level))),
        )
        .init();

    info!("🛣️  Road quality inference starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Smoothing: {} | heatmaps: {}",
        config.smoothing.method, config.inference.generate_heatmap
    );

    let registry = ProgressRegistry::new();
    let video_processor = VideoProcessor::new(config.video.clone());
    let video_files = video_processor.find_video_files()?;

    if video_files.is_empty() {
        error!("No video files found in {}", config.video.input_dir);
        return Ok(());
    }

    info!("Found {} video file(s) to process", video_files.len());

    for (idx, video_path) in video_files.iter().enumerate() {
        info!(
            "Processing video {}/{}: {}",
            idx + 1,
            video_files.len(),
            video_path.display()
        );

        let job = pipeline::submit(config.clone(), video_path.clone(), registry.clone());

        let bar = ProgressBar::new(100).with_style(inference_bar_style());
        bar.set_prefix(job.job_id.clone());

        while !job.handle.is_finished() {
            let snapshot = registry.poll(&job.job_id);
            bar.set_position(snapshot.percent.round() as u64);
            bar.set_message(snapshot.status.as_str().to_string());
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        bar.finish_and_clear();

        match job.handle.await {
            Ok(Ok(run)) => {
                info!("✓ Video processed successfully!");
                info!("  Frames classified: {}", run.raw_probs.len());
                info!("  Annotated video: {}", run.output_video);
                if let Some(ref heatmap) = run.heatmap_video {
                    info!("  Heatmap video: {}", heatmap);
                }
                info!("  Predictions CSV: {}", run.csv_output);

                if config.gps.enabled {
                    if let Err(err) = align_gps_trace(video_path, &run) {
                        warn!("GPS alignment failed: {err}");
                    }
                }
            }
            Ok(Err(err)) => {
                error!("Failed to process video: {err}");
            }
            Err(join_err) => {
                // A panicked run must still end up in an error state.
                registry.fail(&job.job_id, join_err.to_string());
                error!("Inference job crashed: {join_err}");
            }
        }

        let final_status = registry.poll(&job.job_id).status;
        if let JobStatus::Error(ref message) = final_status {
            error!("Job {} ended in error: {}", job.job_id, message);
        }
        registry.remove(&job.job_id);
    }

    Ok(())
}

/// Update the highlight flags of a sibling `<stem>_gps.csv` trace from the
/// smoothed probabilities, in place.
fn align_gps_trace(video_path: &Path, run: &InferenceRun) -> Result<()> {
    let stem = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    let gps_path = video_path.with_file_name(format!("{stem}_gps.csv"));

    if !gps_path.exists() {
        return Ok(());
    }

    let mut points = align::load_geo_csv(&gps_path)?;
    align::align(
        &mut points,
        &run.timestamps,
        &run.raw_probs,
        Some(&run.smoothed_probs),
    );
    align::write_geo_csv(&gps_path, &points)?;
    Ok(())
}
