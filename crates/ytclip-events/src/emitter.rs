//! Typed emitters for the resource and download event families.

use tracing::debug;

use ytclip_models::{
    DownloadStarted, DownloadStatus, DownloadStopped, Event, JobId, MessageStatus, TimeWindow,
};

use crate::bus::EventBus;

/// Publishes events for one resource, keyed by its name.
#[derive(Debug, Clone)]
pub struct ResourceEmitter {
    bus: EventBus,
    key: String,
    title: String,
}

impl ResourceEmitter {
    pub fn new(bus: EventBus, key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            bus,
            key: key.into(),
            title: title.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Publish a progress step (0-100).
    pub fn progress(&self, description: &str, progress: f64) {
        self.bus.publish(Event::resource_progress(
            &self.key,
            &self.title,
            description,
            progress,
        ));
    }

    /// Publish that this resource is verified.
    pub fn stop(&self) {
        self.bus.publish(Event::resource_stop(&self.key, &self.title));
    }

    /// Publish that this resource failed and the pass is aborted.
    pub fn error(&self, message: impl Into<String>) {
        self.bus
            .publish(Event::resource_error(Some(self.key.clone()), message));
    }
}

/// Publishes the lifecycle of one download job.
#[derive(Debug, Clone)]
pub struct DownloadEmitter {
    bus: EventBus,
    job_id: JobId,
}

impl DownloadEmitter {
    pub fn new(bus: EventBus, job_id: JobId) -> Self {
        Self { bus, job_id }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn start(&self, url: &str, window: &TimeWindow) {
        let input = window.to_input();
        self.bus.publish(Event::DownloadStart(DownloadStarted {
            job_id: self.job_id.clone(),
            url: url.to_string(),
            start: input.start,
            end: input.end,
        }));
    }

    pub fn progress(&self, status: DownloadStatus, progress: Option<f64>) {
        debug!(job_id = %self.job_id, ?status, ?progress, "Emitting download progress");
        self.bus.publish(Event::download_progress(
            &self.job_id,
            status,
            progress,
            None,
        ));
    }

    /// Publish a progress event that carries a message.
    pub fn status(&self, status: DownloadStatus, message: impl Into<String>) {
        self.bus.publish(Event::download_progress(
            &self.job_id,
            status,
            None,
            Some(message.into()),
        ));
    }

    pub fn message(&self, status: MessageStatus, message: impl Into<String>) {
        self.bus.publish(Event::message(status, message));
    }

    /// Publish the terminal event of the job.
    pub fn stop(&self, status: DownloadStatus, message: Option<String>, output_path: Option<String>) {
        self.bus.publish(Event::DownloadStop(DownloadStopped {
            job_id: self.job_id.clone(),
            status,
            message,
            output_path,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resource_emitter_keys_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let emitter = ResourceEmitter::new(bus.clone(), "ffmpeg", "FFmpeg");

        emitter.progress("Downloading", 25.0);
        emitter.stop();
        emitter.error("disk full");

        match rx.recv().await.unwrap() {
            Event::ResourceProgress(p) => {
                assert_eq!(p.key, "ffmpeg");
                assert_eq!(p.title, "FFmpeg");
                assert_eq!(p.description, "Downloading");
                assert_eq!(p.progress, 25.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
        match rx.recv().await.unwrap() {
            Event::ResourceStop(p) => assert_eq!(p.progress, 100.0),
            other => panic!("unexpected event {other:?}"),
        }
        match rx.recv().await.unwrap() {
            Event::ResourceError(f) => {
                assert_eq!(f.key.as_deref(), Some("ffmpeg"));
                assert_eq!(f.message, "disk full");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_emitter_lifecycle() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let job_id = JobId::from_string("job-7");
        let emitter = DownloadEmitter::new(bus.clone(), job_id.clone());
        let window = TimeWindow::parse("00:01:00", "00:02:00").unwrap();

        emitter.start("https://example.com/v/1", &window);
        emitter.progress(DownloadStatus::Download, Some(50.0));
        emitter.stop(DownloadStatus::Done, None, Some("/out/job-7.mp4".into()));

        match rx.recv().await.unwrap() {
            Event::DownloadStart(s) => {
                assert_eq!(s.job_id, job_id);
                assert_eq!(s.start, "00:01:00");
                assert_eq!(s.end, "00:02:00");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(rx.recv().await.unwrap(), Event::DownloadProgress(_)));
        match rx.recv().await.unwrap() {
            Event::DownloadStop(s) => {
                assert_eq!(s.status, DownloadStatus::Done);
                assert_eq!(s.output_path.as_deref(), Some("/out/job-7.mp4"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
