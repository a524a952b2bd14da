//! Job error types.

use thiserror::Error;

use ytclip_media::MediaError;
use ytclip_models::TimestampError;

pub type JobResult<T> = Result<T, JobError>;

/// Synchronous rejection of a job submission. No job exists afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Resources are not ready yet")]
    NotReady,

    #[error("Another download is already running")]
    Busy,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl JobError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<TimestampError> for JobError {
    fn from(e: TimestampError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;

/// Why an admitted job ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DownloadError {
    #[error("Could not launch {0}")]
    ToolLaunchError(String),

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("The site refused the download: {0}")]
    RemoteRejected(String),

    #[error("Clip end ({end_secs:.1}s) is past the end of the media ({media_secs:.1}s)")]
    ClipRangeOutOfBounds { end_secs: f64, media_secs: f64 },

    #[error("File system error: {0}")]
    IoFailure(String),

    #[error("{0}")]
    ToolFailed(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// The job body panicked.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DownloadError {
    /// Short machine-readable name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::ToolLaunchError(_) => "tool_launch",
            DownloadError::UnsupportedUrl(_) => "unsupported_url",
            DownloadError::RemoteRejected(_) => "remote_rejected",
            DownloadError::ClipRangeOutOfBounds { .. } => "clip_range",
            DownloadError::IoFailure(_) => "io",
            DownloadError::ToolFailed(_) => "tool_failed",
            DownloadError::Cancelled => "cancelled",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::Internal(_) => "internal",
        }
    }
}

impl From<MediaError> for DownloadError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::ToolNotFound { .. } | MediaError::Spawn { .. } => {
                DownloadError::ToolLaunchError(e.to_string())
            }
            MediaError::UnsupportedUrl(msg) => DownloadError::UnsupportedUrl(msg),
            MediaError::RemoteRejected(msg) => DownloadError::RemoteRejected(msg),
            MediaError::FileNotFound(_) | MediaError::Io(_) => DownloadError::IoFailure(e.to_string()),
            MediaError::Cancelled => DownloadError::Cancelled,
            MediaError::Timeout(secs) => DownloadError::Timeout(secs),
            MediaError::ToolFailed { .. }
            | MediaError::DownloadFailed { .. }
            | MediaError::FfprobeFailed { .. }
            | MediaError::InvalidMedia(_)
            | MediaError::JsonParse(_)
            | MediaError::Internal(_) => DownloadError::ToolFailed(e.to_string()),
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        DownloadError::IoFailure(e.to_string())
    }
}

impl From<TimestampError> for DownloadError {
    fn from(e: TimestampError) -> Self {
        match e {
            TimestampError::ExceedsMediaDuration {
                end_secs,
                media_secs,
            } => DownloadError::ClipRangeOutOfBounds {
                end_secs,
                media_secs,
            },
            other => DownloadError::ToolFailed(other.to_string()),
        }
    }
}
