//! Download job identity and lifecycle phases.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a download job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase of a download job.
///
/// `Done` and `Failed` are terminal. The failure reason is carried by the
/// job itself, not by this serializable phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not started yet
    #[default]
    Pending,
    /// Confirming the tools are still in place
    ResourceCheck,
    /// yt-dlp is fetching the media
    Downloading,
    /// FFmpeg is cutting the window out of the media
    Clipping,
    /// Output file written
    Done,
    /// Gave up with an error
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::ResourceCheck => "resource_check",
            JobState::Downloading => "downloading",
            JobState::Clipping => "clipping",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Pending, ResourceCheck)
            | (ResourceCheck, Downloading)
            | (Downloading, Clipping)
            | (Clipping, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_unique() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert_eq!(JobId::from_string("job-1").as_str(), "job-1");
    }

    #[test]
    fn test_job_state_transitions() {
        assert!(JobState::Pending.can_transition_to(JobState::ResourceCheck));
        assert!(JobState::Downloading.can_transition_to(JobState::Clipping));
        assert!(JobState::Clipping.can_transition_to(JobState::Done));
        assert!(JobState::Downloading.can_transition_to(JobState::Failed));

        assert!(!JobState::Pending.can_transition_to(JobState::Clipping));
        assert!(!JobState::Done.can_transition_to(JobState::Failed));
        assert!(!JobState::Failed.can_transition_to(JobState::Failed));
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Clipping.is_terminal());
        assert_eq!(JobState::ResourceCheck.to_string(), "resource_check");
    }
}
