//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use ytclip_media::DEFAULT_FORMAT_SORT;
use ytclip_models::EncodingConfig;
use ytclip_resources::DEFAULT_YTDLP_VERSION;

/// Directory name under the user's home used when `YTCLIP_HOME` is unset.
const DEFAULT_HOME_DIR: &str = ".ytclip";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of everything the backend writes
    pub home_dir: PathBuf,
    /// Managed tool binaries
    pub resources_dir: PathBuf,
    /// Per-job scratch directories
    pub temp_dir: PathBuf,
    /// Finished clips
    pub output_dir: PathBuf,
    /// Event bus capacity
    pub event_capacity: usize,
    /// Upper bound for the yt-dlp step (unset = unbounded)
    pub download_timeout: Option<Duration>,
    /// Upper bound for the ffmpeg step (unset = unbounded)
    pub clip_timeout: Option<Duration>,
    /// Upper bound for installing one resource (unset = unbounded)
    pub install_timeout: Option<Duration>,
    /// yt-dlp `-S` format sort
    pub format_sort: String,
    /// Pinned yt-dlp release
    pub ytdlp_version: String,
    /// Hosts jobs may download from; empty allows any host
    pub allowed_hosts: Vec<String>,
    /// Keep the job's scratch directory after a successful clip
    pub keep_temp: bool,
    pub encoding: EncodingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_home(default_home())
    }
}

impl AppConfig {
    /// Defaults rooted at `home`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home_dir = home.into();
        Self {
            resources_dir: home_dir.join("resources"),
            temp_dir: home_dir.join("temp"),
            output_dir: home_dir.join("download"),
            home_dir,
            event_capacity: ytclip_events::DEFAULT_CAPACITY,
            download_timeout: None,
            clip_timeout: None,
            install_timeout: None,
            format_sort: DEFAULT_FORMAT_SORT.to_string(),
            ytdlp_version: DEFAULT_YTDLP_VERSION.to_string(),
            allowed_hosts: Vec::new(),
            keep_temp: false,
            encoding: EncodingConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_env_at(std::env::var("YTCLIP_HOME").ok().map(PathBuf::from))
    }

    /// Like [`AppConfig::from_env`], with `home` taking precedence over `YTCLIP_HOME`.
    pub fn from_env_at(home: Option<PathBuf>) -> Self {
        let mut config = Self::with_home(home.unwrap_or_else(default_home));

        if let Ok(dir) = std::env::var("YTCLIP_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config.event_capacity = env_parse("YTCLIP_EVENT_CAPACITY").unwrap_or(config.event_capacity);
        config.download_timeout = env_secs("YTCLIP_DOWNLOAD_TIMEOUT_SECS");
        config.clip_timeout = env_secs("YTCLIP_CLIP_TIMEOUT_SECS");
        config.install_timeout = env_secs("YTCLIP_INSTALL_TIMEOUT_SECS");
        if let Ok(sort) = std::env::var("YTCLIP_FORMAT_SORT") {
            config.format_sort = sort;
        }
        if let Ok(version) = std::env::var("YTCLIP_YTDLP_VERSION") {
            config.ytdlp_version = version;
        }
        if let Ok(hosts) = std::env::var("YTCLIP_ALLOWED_HOSTS") {
            config.allowed_hosts = parse_hosts(&hosts);
        }
        config.keep_temp = std::env::var("YTCLIP_KEEP_TEMP")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        config
    }

    /// Directories the resource pass creates before verifying.
    pub fn work_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.resources_dir.clone(),
            self.temp_dir.clone(),
            self.output_dir.clone(),
        ]
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_HOME_DIR)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Zero or unparseable means unbounded.
fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parse_hosts(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|h| h.trim().trim_start_matches("*.").to_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
