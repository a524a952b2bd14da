//! Shared data models for the ytclip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Clip time windows and `HH:MM:SS` parsing
//! - Download job identity and lifecycle phases
//! - Event topics and payloads published to the UI
//! - Clip encoding configuration

pub mod encoding;
pub mod event;
pub mod job;
pub mod timestamp;

// Re-export common types
pub use encoding::{ClipMode, EncodingConfig};
pub use event::{
    DownloadProgress, DownloadStarted, DownloadStatus, DownloadStopped, Event, EventTopic,
    MessageStatus, Notice, ResourceFailure, ResourceProgress,
};
pub use job::{JobId, JobState};
pub use timestamp::{format_clock, parse_clock, TimeWindow, TimestampError, WindowInput};
