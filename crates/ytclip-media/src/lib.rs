//! yt-dlp and FFmpeg CLI wrappers.
//!
//! This crate provides:
//! - A subprocess runner with line-based progress, timeout and cancellation
//! - Type-safe FFmpeg command building and `-progress pipe:2` parsing
//! - yt-dlp downloads with `[download] NN%` progress and failure classification
//! - FFprobe duration probing
//! - Window clipping

pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod tools;

pub use clip::{build_clip_command, clip_extension, clip_media};
pub use command::{FfmpegCommand, ProgressPipe, ToolOutput, ToolRunner};
pub use download::{classify_failure, YtDlp, DEFAULT_FORMAT_SORT};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use progress::{parse_ytdlp_progress, FfmpegProgress};
pub use tools::{resolve_program, ToolPaths};
