//! Resource provisioning metrics.

use metrics::{counter, histogram};

pub mod names {
    pub const SETUP_PASSES_TOTAL: &str = "ytclip_resource_setup_passes_total";
    pub const SETUP_DURATION_SECONDS: &str = "ytclip_resource_setup_duration_seconds";
    pub const RESOURCE_FAILURES_TOTAL: &str = "ytclip_resource_failures_total";
}

/// Record the outcome of a verification pass.
pub fn record_setup_pass(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::SETUP_PASSES_TOTAL, &labels).increment(1);
    histogram!(names::SETUP_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed resource.
pub fn record_resource_failure(resource: &str) {
    let labels = [("resource", resource.to_string())];
    counter!(names::RESOURCE_FAILURES_TOTAL, &labels).increment(1);
}
