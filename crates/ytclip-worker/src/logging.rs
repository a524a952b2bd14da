//! Structured job logging utilities.
//!
//! Every line a download job logs carries the job ID and URL so a single
//! job can be followed through yt-dlp, ffprobe and ffmpeg.

use tracing::{error, info, warn, Span};
use ytclip_models::{JobId, JobState};

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    url: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, url: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            url: url.to_string(),
        }
    }

    pub fn log_start(&self, window: &str) {
        info!(job_id = %self.job_id, url = %self.url, window, "Job started");
    }

    /// Log a state transition.
    pub fn log_state(&self, from: JobState, to: JobState) {
        info!(job_id = %self.job_id, from = %from, to = %to, "Job state changed");
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, "Job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, url = %self.url, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, url = %self.url, "Job failed: {}", message);
    }

    pub fn log_completion(&self, output: &str, elapsed_secs: f64) {
        info!(
            job_id = %self.job_id,
            output,
            elapsed_secs,
            "Job completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span the job's driver task runs in.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("download_job", job_id = %self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "https://example.com/v/1");
        assert_eq!(logger.job_id(), job_id.to_string());
    }
}
