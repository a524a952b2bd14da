//! Download-and-clip job pipeline.
//!
//! This crate provides:
//! - [`App`]: the facade a UI bridge calls (setup, start, subscribe, cancel)
//! - [`JobGuard`]: readiness, input and exclusivity checks before a job runs
//! - [`DownloadJob`]: the download, probe and clip state machine
//! - [`MediaBackend`]: the seam between jobs and the external tools
//! - Configuration, job logging and metrics

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod job;
pub mod logging;
pub mod metrics;

pub use app::App;
pub use backend::{MediaBackend, ProgressFn, ToolchainBackend};
pub use config::AppConfig;
pub use error::{DownloadError, DownloadResult, JobError, JobResult};
pub use guard::{validate_url, JobGuard};
pub use job::{DownloadJob, JobContext, JobOutcome};
pub use logging::JobLogger;
