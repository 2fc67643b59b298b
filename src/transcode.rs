// src/transcode.rs
//
// Boundary to the external codec-conversion utility. Re-encodes a finished
// output to H.264 in place; a missing or failing ffmpeg leaves the original
// file as written.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

pub fn transcode_to_h264(path: &Path) {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        warn!("Skipping transcode of non-utf8 path {}", path.display());
        return;
    };
    let tmp = path.with_file_name(format!(".{name}.transcode.mp4"));

    info!("🎬 Transcoding {name} → H.264 (overwrite in place)");

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(path)
        .args([
            "-c:v",
            "libx264",
            "-preset",
            "fast",
            "-crf",
            "23",
            "-c:a",
            "aac",
            "-movflags",
            "+faststart",
        ])
        .arg(&tmp)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(code) if code.success() => match fs::rename(&tmp, path) {
            Ok(()) => info!("✓ Transcoding complete: {name}"),
            Err(err) => {
                warn!("Could not replace {name} with transcoded file: {err}");
                let _ = fs::remove_file(&tmp);
            }
        },
        Ok(code) => {
            warn!("ffmpeg exited with {code} while transcoding {name}");
            let _ = fs::remove_file(&tmp);
        }
        Err(err) => {
            warn!("ffmpeg not available ({err}); keeping {name} as written");
            let _ = fs::remove_file(&tmp);
        }
    }
}
