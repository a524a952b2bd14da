//! Download job metrics.

use metrics::{counter, histogram};

pub mod names {
    pub const JOBS_TOTAL: &str = "ytclip_jobs_total";
    pub const JOB_DURATION_SECONDS: &str = "ytclip_job_duration_seconds";
    pub const JOB_REJECTIONS_TOTAL: &str = "ytclip_job_rejections_total";
}

/// Record a finished job. `outcome` is `done` or the error kind.
pub fn record_job(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a submission turned away by the guard.
pub fn record_rejection(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOB_REJECTIONS_TOTAL, &labels).increment(1);
}
