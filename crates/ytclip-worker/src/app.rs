//! The backend facade a UI bridge calls into.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tracing::info;

use ytclip_events::{EventBus, Subscription};
use ytclip_models::{Event, EventTopic, JobId, WindowInput};
use ytclip_resources::{
    default_resources, default_tool_paths, CatalogOptions, ResourceManager, ResourceResult,
    ToolVerifier,
};

use crate::backend::{MediaBackend, ToolchainBackend};
use crate::config::AppConfig;
use crate::error::JobResult;
use crate::guard::JobGuard;
use crate::job::JobContext;

/// Owns the event bus, the resource manager and the job guard.
pub struct App {
    config: AppConfig,
    bus: EventBus,
    resources: Arc<ResourceManager>,
    guard: JobGuard,
    last_url: RwLock<Option<String>>,
}

impl App {
    /// Wire the default resource catalog and the real toolchain.
    pub fn new(config: AppConfig) -> Self {
        let bus = EventBus::new(config.event_capacity);

        let mut catalog = CatalogOptions::new(&config.resources_dir);
        catalog.ytdlp_version = config.ytdlp_version.clone();
        let verifier = ToolVerifier::new().with_install_timeout(config.install_timeout);
        let resources = ResourceManager::new(default_resources(&catalog), Arc::new(verifier), bus.clone())
            .with_work_dirs(config.work_dirs());

        let backend = ToolchainBackend::new(
            default_tool_paths(&catalog),
            &config.format_sort,
            config.encoding.clone(),
        );

        Self::with_parts(config, bus, Arc::new(resources), Arc::new(backend))
    }

    /// Wire explicit parts. The resource manager must publish on `bus`.
    pub fn with_parts(
        config: AppConfig,
        bus: EventBus,
        resources: Arc<ResourceManager>,
        backend: Arc<dyn MediaBackend>,
    ) -> Self {
        let ctx = Arc::new(JobContext {
            bus: bus.clone(),
            backend,
            temp_dir: config.temp_dir.clone(),
            output_dir: config.output_dir.clone(),
            download_timeout: config.download_timeout,
            clip_timeout: config.clip_timeout,
            keep_temp: config.keep_temp,
        });
        let guard = JobGuard::new(resources.readiness(), ctx)
            .with_allowed_hosts(config.allowed_hosts.clone());

        Self {
            config,
            bus,
            resources,
            guard,
            last_url: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn resources(&self) -> &Arc<ResourceManager> {
        &self.resources
    }

    /// Start the resource pass in the background. The UI may ignore the handle.
    pub fn setup_resources(&self) -> JoinHandle<ResourceResult<()>> {
        info!(home = %self.config.home_dir.display(), "Setting up resources");
        self.resources.setup()
    }

    /// Submit a download. Returns once the job is admitted or rejected.
    pub fn start_download(&self, url: &str, window: &WindowInput) -> JobResult<JobId> {
        let id = self.guard.start(url, window)?;
        *self
            .last_url
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(url.trim().to_string());
        Ok(id)
    }

    /// Deliver every future event on `topic` to `handler` until the
    /// subscription is dropped.
    pub fn subscribe<F>(&self, topic: EventTopic, handler: F) -> Subscription
    where
        F: Fn(Event) + Send + 'static,
    {
        self.bus.on(topic, handler)
    }

    /// Cancel the running download, if any.
    pub fn cancel_download(&self) -> bool {
        self.guard.cancel()
    }

    /// URL of the most recently admitted download.
    pub fn last_url(&self) -> Option<String> {
        self.last_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn active_job(&self) -> Option<JobId> {
        self.guard.active_job()
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn is_ready(&self) -> bool {
        self.resources.is_ready()
    }
}
