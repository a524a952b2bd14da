#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, Notify};
use ytclip_events::EventBus;
use ytclip_media::{MediaError, MediaResult, ToolRunner};
use ytclip_models::{DownloadStopped, Event, TimeWindow};
use ytclip_resources::{ProgressReporter, Resource, ResourceManager, ResourceResult, ResourceVerifier};
use ytclip_worker::{App, AppConfig, MediaBackend, ProgressFn};

/// What the fake does when asked to fetch.
#[derive(Clone)]
pub enum Fetch {
    Ok,
    Unsupported,
    Rejected,
    /// Never finishes on its own
    Hang,
    /// Panics inside the backend
    Panic,
    /// Waits for the notify, then succeeds
    Gate(Arc<Notify>),
}

pub struct FakeBackend {
    pub fetch: Fetch,
    pub duration: f64,
    pub tools_ok: bool,
    pub clip_fails: bool,
    pub clipped: Mutex<Vec<TimeWindow>>,
}

impl FakeBackend {
    pub fn new(fetch: Fetch) -> Self {
        Self {
            fetch,
            duration: 600.0,
            tools_ok: true,
            clip_fails: false,
            clipped: Mutex::new(Vec::new()),
        }
    }

    pub fn clipped(&self) -> Vec<TimeWindow> {
        self.clipped.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    async fn check_tools(&self) -> MediaResult<()> {
        if self.tools_ok {
            Ok(())
        } else {
            Err(MediaError::ToolNotFound {
                tool: "yt-dlp".into(),
                path: PathBuf::from("/missing/yt-dlp"),
            })
        }
    }

    async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        stem: &str,
        _runner: &ToolRunner,
        on_progress: ProgressFn,
    ) -> MediaResult<PathBuf> {
        match &self.fetch {
            Fetch::Ok => {}
            Fetch::Unsupported => {
                return Err(MediaError::UnsupportedUrl(format!("ERROR: Unsupported URL: {url}")))
            }
            Fetch::Rejected => {
                return Err(MediaError::RemoteRejected("ERROR: Private video".into()))
            }
            Fetch::Hang => std::future::pending::<()>().await,
            Fetch::Panic => panic!("backend exploded"),
            Fetch::Gate(gate) => gate.notified().await,
        }
        tokio::fs::create_dir_all(dest_dir).await?;
        on_progress(25.0);
        on_progress(100.0);
        let media = dest_dir.join(format!("{stem}.mp4"));
        tokio::fs::write(&media, b"media").await?;
        Ok(media)
    }

    async fn probe_duration(&self, _media: &Path) -> MediaResult<f64> {
        Ok(self.duration)
    }

    async fn clip(
        &self,
        _input: &Path,
        output: &Path,
        window: &TimeWindow,
        _runner: &ToolRunner,
        on_progress: ProgressFn,
    ) -> MediaResult<()> {
        self.clipped.lock().unwrap().push(*window);
        if self.clip_fails {
            return Err(MediaError::tool_failed("ffmpeg", "Conversion failed!", None, Some(1)));
        }
        on_progress(50.0);
        on_progress(100.0);
        tokio::fs::write(output, window.to_string()).await?;
        Ok(())
    }

    fn output_extension(&self, _input: &Path) -> String {
        "mp4".to_string()
    }
}

struct AlwaysVerified;

#[async_trait]
impl ResourceVerifier for AlwaysVerified {
    async fn ensure(&self, _: &Resource, _: &ProgressReporter) -> ResourceResult<()> {
        Ok(())
    }
}

/// App over `backend` whose resource pass has not run yet.
pub fn app(home: &Path, backend: Arc<dyn MediaBackend>) -> App {
    app_with(AppConfig::with_home(home), backend)
}

pub fn app_with(config: AppConfig, backend: Arc<dyn MediaBackend>) -> App {
    let bus = EventBus::new(1024);
    let manager = ResourceManager::new(Vec::new(), Arc::new(AlwaysVerified), bus.clone())
        .with_work_dirs(config.work_dirs());
    App::with_parts(config, bus, Arc::new(manager), backend)
}

/// App over `backend` with the resource pass already done.
pub async fn ready_app(home: &Path, backend: Arc<dyn MediaBackend>) -> App {
    let app = app(home, backend);
    app.resources().run_setup().await.unwrap();
    app
}

/// Collect events until the first `download-stop`.
pub async fn until_stop(rx: &mut broadcast::Receiver<Event>) -> (Vec<Event>, DownloadStopped) {
    let mut events = Vec::new();
    let collect = async {
        loop {
            let event = rx.recv().await.unwrap();
            if let Event::DownloadStop(stop) = &event {
                let stop = stop.clone();
                events.push(event);
                return stop;
            }
            events.push(event);
        }
    };
    let stop = tokio::time::timeout(Duration::from_secs(10), collect)
        .await
        .expect("job did not finish");
    (events, stop)
}

/// Everything published so far.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
