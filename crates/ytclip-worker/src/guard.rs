//! Admission control: at most one download job at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use ytclip_models::{JobId, WindowInput};
use ytclip_resources::ReadinessHandle;

use crate::error::{JobError, JobResult};
use crate::job::{DownloadJob, JobContext};
use crate::metrics;

struct ActiveJob {
    id: JobId,
    cancel: watch::Sender<bool>,
}

type Slot = Arc<Mutex<Option<ActiveJob>>>;

/// Admits download jobs.
///
/// A submission is checked in a fixed order: readiness first, then the
/// input, then whether another job is still running. Rejected submissions
/// have no side effects; nothing is queued.
pub struct JobGuard {
    readiness: ReadinessHandle,
    ctx: Arc<JobContext>,
    allowed_hosts: Vec<String>,
    active: Slot,
}

impl JobGuard {
    pub fn new(readiness: ReadinessHandle, ctx: Arc<JobContext>) -> Self {
        Self {
            readiness,
            ctx,
            allowed_hosts: Vec::new(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Only accept URLs on these hosts (or their subdomains).
    pub fn with_allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_hosts = hosts;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Validate and admit a job, spawning it on the current runtime.
    ///
    /// Returns as soon as the job is spawned; its progress arrives on the
    /// event bus.
    pub fn start(&self, url: &str, window: &WindowInput) -> JobResult<JobId> {
        if !self.readiness.is_ready() {
            metrics::record_rejection("not_ready");
            return Err(JobError::NotReady);
        }

        let url = match validate_url(url, &self.allowed_hosts) {
            Ok(url) => url,
            Err(e) => {
                metrics::record_rejection("invalid_input");
                return Err(e);
            }
        };
        let window = match window.parse() {
            Ok(window) => window,
            Err(e) => {
                metrics::record_rejection("invalid_input");
                return Err(e.into());
            }
        };

        let mut slot = lock(&self.active);
        if let Some(active) = slot.as_ref() {
            info!(active_job = %active.id, "Rejecting download, another job is running");
            metrics::record_rejection("busy");
            return Err(JobError::Busy);
        }

        let id = JobId::new();
        let (cancel, cancel_rx) = watch::channel(false);
        let job = DownloadJob::new(
            id.clone(),
            url.as_str(),
            window,
            Arc::clone(&self.ctx),
            cancel_rx,
        );
        *slot = Some(ActiveJob {
            id: id.clone(),
            cancel,
        });
        drop(slot);

        let active = Arc::clone(&self.active);
        let release_id = id.clone();
        tokio::spawn(async move {
            job.run(move || release(&active, &release_id)).await;
        });

        info!(job_id = %id, url = %url, "Download job admitted");
        Ok(id)
    }

    /// Ask the running job to stop. Returns false if nothing is running.
    pub fn cancel(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(active) => {
                info!(job_id = %active.id, "Cancelling download job");
                active.cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    pub fn active_job(&self) -> Option<JobId> {
        lock(&self.active).as_ref().map(|a| a.id.clone())
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.active).is_some()
    }
}

fn lock(slot: &Slot) -> MutexGuard<'_, Option<ActiveJob>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn release(slot: &Slot, id: &JobId) {
    let mut slot = lock(slot);
    match slot.as_ref() {
        Some(active) if &active.id == id => *slot = None,
        _ => warn!(job_id = %id, "Released a job that was not active"),
    }
}

/// Accept absolute http(s) URLs with a host, optionally restricted to `allowed_hosts`.
pub fn validate_url(input: &str, allowed_hosts: &[String]) -> JobResult<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(JobError::invalid_input("URL cannot be empty"));
    }

    let url = Url::parse(input).map_err(|e| JobError::invalid_input(format!("Invalid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(JobError::invalid_input(format!(
            "Unsupported URL scheme '{}'",
            url.scheme()
        )));
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_lowercase(),
        _ => return Err(JobError::invalid_input("URL has no host")),
    };

    if !allowed_hosts.is_empty() && !allowed_hosts.iter().any(|h| host_matches(&host, h)) {
        return Err(JobError::invalid_input(format!(
            "Host '{}' is not allowed",
            host
        )));
    }
    Ok(url)
}

fn host_matches(host: &str, allowed: &str) -> bool {
    host == allowed
        || host
            .strip_suffix(allowed)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
