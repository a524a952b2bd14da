//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::tools::resolve_program;

/// Upper bound for a single probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Container-level facts about a downloaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    pub has_video: bool,
    pub has_audio: bool,
    /// File size in bytes
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
}

/// Probe `path` with the given ffprobe binary.
pub async fn probe_media(ffprobe: &Path, path: &Path) -> MediaResult<MediaInfo> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let program = resolve_program(ffprobe).ok_or_else(|| MediaError::ToolNotFound {
        tool: "ffprobe".to_string(),
        path: ffprobe.to_path_buf(),
    })?;

    let run = Command::new(&program)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_entries",
            "format=duration,size:stream=codec_type",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(PROBE_TIMEOUT, run)
        .await
        .map_err(|_| MediaError::Timeout(PROBE_TIMEOUT.as_secs()))?
        .map_err(|source| MediaError::Spawn {
            tool: "ffprobe".to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(MediaError::FfprobeFailed {
            message: stderr
                .lines()
                .last()
                .unwrap_or("FFprobe failed")
                .to_string(),
            stderr: Some(stderr),
        });
    }

    let info = parse_probe_output(&output.stdout)?;
    debug!(path = %path.display(), duration = info.duration, "Probed media");
    Ok(info)
}

/// Probe only the duration.
pub async fn probe_duration(ffprobe: &Path, path: &Path) -> MediaResult<f64> {
    Ok(probe_media(ffprobe, path).await?.duration)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;
    let format = probe
        .format
        .ok_or_else(|| MediaError::InvalidMedia("No container format reported".to_string()))?;

    let duration = format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MediaError::InvalidMedia("Unknown media duration".to_string()))?;

    let has = |kind: &str| {
        probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some(kind))
    };

    Ok(MediaInfo {
        duration,
        has_video: has("video"),
        has_audio: has("audio"),
        size: format
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
    })
}
