//! Progress parsing for FFmpeg and yt-dlp output.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Progress block reported by FFmpeg's `-progress pipe:2`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output position in microseconds
    pub out_time_us: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether FFmpeg reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of `total_secs` written so far, capped at 100.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_secs <= 0.0 || self.out_time_us <= 0 {
            return 0.0;
        }
        ((self.out_time_us as f64 / 1_000_000.0) / total_secs * 100.0).min(100.0)
    }

    /// Fold one `key=value` line into the running state.
    ///
    /// Returns a snapshot when the line closes a block (`progress=...`).
    pub fn apply_line(&mut self, line: &str) -> Option<FfmpegProgress> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // FFmpeg reports microseconds under both names.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_us = us;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.frame = frame;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                if value == "end" {
                    self.is_complete = true;
                }
                return Some(self.clone());
            }
            _ => {}
        }
        None
    }
}

static YTDLP_PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%").unwrap());

/// Extract the percentage from a yt-dlp `--newline` progress line.
///
/// `[download]  42.3% of 10.00MiB at 1.00MiB/s ETA 00:05` yields `42.3`.
pub fn parse_ytdlp_progress(line: &str) -> Option<f64> {
    let caps = YTDLP_PROGRESS.captures(line.trim_start())?;
    let pct: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(pct.clamp(0.0, 100.0))
}
