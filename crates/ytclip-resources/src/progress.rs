//! Progress callbacks for verification and installation.

use std::fmt;
use std::sync::Arc;

/// Step descriptions shown next to a resource's progress bar.
pub mod steps {
    pub const CHECKING: &str = "Checking";
    pub const NOT_FOUND: &str = "Not found";
    pub const OUTDATED: &str = "Outdated";
    pub const DOWNLOADING: &str = "Downloading";
    pub const EXTRACTING: &str = "Extracting";
    pub const VERIFYING: &str = "Verifying";
    pub const INSTALLED: &str = "Installed";
    pub const READY: &str = "Ready";
}

type ReportFn = dyn Fn(&str, f64) + Send + Sync;

/// Receives `(description, percent)` updates for one resource.
///
/// Reporters can be narrowed to a sub-range so an installer reports
/// 0-100 for its own step while the overall bar advances within a slice.
#[derive(Clone)]
pub struct ProgressReporter {
    report: Arc<ReportFn>,
    from: f64,
    to: f64,
}

impl ProgressReporter {
    pub fn new<F>(report: F) -> Self
    where
        F: Fn(&str, f64) + Send + Sync + 'static,
    {
        Self {
            report: Arc::new(report),
            from: 0.0,
            to: 100.0,
        }
    }

    /// Reporter that discards every update.
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    /// Report `percent` (0-100) of this reporter's range.
    pub fn report(&self, description: &str, percent: f64) {
        let pct = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        (self.report)(description, self.from + (self.to - self.from) * pct / 100.0);
    }

    /// Reporter mapping 0-100 onto `[from, to]` of this reporter's range.
    pub fn scaled(&self, from: f64, to: f64) -> Self {
        let span = self.to - self.from;
        Self {
            report: Arc::clone(&self.report),
            from: self.from + span * from / 100.0,
            to: self.from + span * to / 100.0,
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}
