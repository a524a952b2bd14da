//! The download-and-clip pipeline of one job.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::Instrument;

use ytclip_events::{DownloadEmitter, EventBus};
use ytclip_media::{fs_utils, ToolRunner};
use ytclip_models::{DownloadStatus, JobId, JobState, MessageStatus, TimeWindow};

use crate::backend::{MediaBackend, ProgressFn};
use crate::error::{DownloadError, DownloadResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Everything a job needs that outlives it.
pub struct JobContext {
    pub bus: EventBus,
    pub backend: Arc<dyn MediaBackend>,
    /// Parent of the per-job scratch directories
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub download_timeout: Option<Duration>,
    pub clip_timeout: Option<Duration>,
    pub keep_temp: bool,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Done { output: PathBuf },
    Failed(DownloadError),
}

/// One download-and-clip request, driven to a terminal state by [`DownloadJob::run`].
pub struct DownloadJob {
    id: JobId,
    url: String,
    window: TimeWindow,
    state: JobState,
    ctx: Arc<JobContext>,
    cancel_rx: watch::Receiver<bool>,
    emitter: DownloadEmitter,
    logger: JobLogger,
}

impl DownloadJob {
    pub fn new(
        id: JobId,
        url: impl Into<String>,
        window: TimeWindow,
        ctx: Arc<JobContext>,
        cancel_rx: watch::Receiver<bool>,
    ) -> Self {
        let url = url.into();
        let emitter = DownloadEmitter::new(ctx.bus.clone(), id.clone());
        let logger = JobLogger::new(&id, &url);
        Self {
            id,
            url,
            window,
            state: JobState::Pending,
            ctx,
            cancel_rx,
            emitter,
            logger,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Drive the job to a terminal state and publish its terminal events.
    ///
    /// `release` runs after the job is terminal and before `download-stop`
    /// is published, so a listener reacting to the stop can submit again.
    pub async fn run<R>(mut self, release: R) -> JobOutcome
    where
        R: FnOnce() + Send,
    {
        let span = self.logger.create_span();
        let started = Instant::now();
        self.logger.log_start(&self.window.to_string());

        let result = match AssertUnwindSafe(self.execute().instrument(span))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(DownloadError::Internal(panic_message(payload.as_ref()))),
        };

        let outcome = match result {
            Ok(output) => {
                self.transition(JobState::Done);
                self.logger
                    .log_completion(&output.display().to_string(), started.elapsed().as_secs_f64());
                metrics::record_job("done", started.elapsed().as_secs_f64());
                self.emitter.progress(DownloadStatus::Done, Some(100.0));
                self.emitter.message(
                    MessageStatus::Success,
                    format!("Clip saved to {}", output.display()),
                );
                JobOutcome::Done { output }
            }
            Err(e) => {
                self.transition(JobState::Failed);
                self.logger.log_error(&e.to_string());
                metrics::record_job(e.kind(), started.elapsed().as_secs_f64());
                self.emitter.status(DownloadStatus::Error, e.to_string());
                self.emitter.message(MessageStatus::Error, e.to_string());
                JobOutcome::Failed(e)
            }
        };

        release();

        match &outcome {
            JobOutcome::Done { output } => self.emitter.stop(
                DownloadStatus::Done,
                None,
                Some(output.display().to_string()),
            ),
            JobOutcome::Failed(e) => {
                self.emitter
                    .stop(DownloadStatus::Error, Some(e.to_string()), None)
            }
        }
        outcome
    }

    async fn execute(&mut self) -> DownloadResult<PathBuf> {
        self.transition(JobState::ResourceCheck);
        self.emitter
            .status(DownloadStatus::Pending, "Checking tools");
        let backend = Arc::clone(&self.ctx.backend);
        self.guarded(backend.check_tools()).await?;

        self.transition(JobState::Downloading);
        self.emitter.start(&self.url, &self.window);
        let work_dir = self.ctx.temp_dir.join(self.id.as_str());
        let media = self.download(&work_dir).await?;

        self.transition(JobState::Clipping);
        let duration = self.guarded(backend.probe_duration(&media)).await?;
        self.window.fits_within(duration)?;
        let output = self.clip(&media, &work_dir).await?;

        if self.ctx.keep_temp {
            self.logger
                .log_progress(&format!("Keeping {}", work_dir.display()));
        } else {
            fs_utils::remove_dir_quietly(&work_dir).await;
        }
        Ok(output)
    }

    async fn download(&self, work_dir: &Path) -> DownloadResult<PathBuf> {
        let runner = self.runner(self.ctx.download_timeout);
        let emitter = self.emitter.clone();
        let on_progress: ProgressFn =
            Arc::new(move |pct| emitter.progress(DownloadStatus::Download, Some(pct)));

        let backend = Arc::clone(&self.ctx.backend);
        let media = self
            .guarded(backend.fetch(&self.url, work_dir, self.id.as_str(), &runner, on_progress))
            .await?;
        self.logger
            .log_progress(&format!("Downloaded {}", media.display()));
        Ok(media)
    }

    /// Clip into the scratch directory, then move the result into the output directory.
    async fn clip(&self, media: &Path, work_dir: &Path) -> DownloadResult<PathBuf> {
        let backend = Arc::clone(&self.ctx.backend);
        let ext = backend.output_extension(media);
        let staged = work_dir.join(format!("clip.{ext}"));
        let output = self.ctx.output_dir.join(format!("{}.{}", self.id, ext));

        self.emitter.progress(DownloadStatus::Processing, Some(0.0));
        let runner = self.runner(self.ctx.clip_timeout);
        let emitter = self.emitter.clone();
        let on_progress: ProgressFn =
            Arc::new(move |pct| emitter.progress(DownloadStatus::Processing, Some(pct)));

        self.guarded(backend.clip(media, &staged, &self.window, &runner, on_progress))
            .await?;

        tokio::fs::create_dir_all(&self.ctx.output_dir).await?;
        fs_utils::move_file(&staged, &output).await?;
        Ok(output)
    }

    fn runner(&self, timeout: Option<Duration>) -> ToolRunner {
        let runner = ToolRunner::new().with_cancel(self.cancel_rx.clone());
        match timeout {
            Some(t) => runner.with_timeout(t),
            None => runner,
        }
    }

    /// Run one step, giving up as soon as the job is cancelled.
    async fn guarded<T, E, F>(&self, step: F) -> DownloadResult<T>
    where
        F: Future<Output = Result<T, E>>,
        DownloadError: From<E>,
    {
        if *self.cancel_rx.borrow() {
            return Err(DownloadError::Cancelled);
        }
        tokio::select! {
            result = step => result.map_err(DownloadError::from),
            _ = cancelled(self.cancel_rx.clone()) => Err(DownloadError::Cancelled),
        }
    }

    fn transition(&mut self, next: JobState) {
        if !self.state.can_transition_to(next) {
            self.logger.log_warning(&format!(
                "Ignoring transition {} -> {}",
                self.state, next
            ));
            return;
        }
        self.logger.log_state(self.state, next);
        self.state = next;
    }
}

/// Resolves once cancellation is requested. Never resolves if the sender is gone.
async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "job panicked");
    }

    #[tokio::test]
    async fn test_cancelled_waits_for_signal() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(cancelled(rx));
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_pends_without_sender() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let waited = tokio::time::timeout(Duration::from_millis(50), cancelled(rx)).await;
        assert!(waited.is_err());
    }
}
