//! The default set of resources for this platform.

use std::path::PathBuf;
use std::sync::Arc;

use ytclip_media::ToolPaths;

use crate::installer::{ArchiveDownload, ArchiveEntry, BinaryDownload, Installer, SystemPath};
use crate::resource::Resource;

/// Pinned yt-dlp release.
pub const DEFAULT_YTDLP_VERSION: &str = "2024.05.27";

const YTDLP_RELEASES: &str = "https://github.com/yt-dlp/yt-dlp/releases/download";

const FFMPEG_WIN64_URL: &str = "https://github.com/BtbN/FFmpeg-Builds/releases/download/autobuild-2024-08-20-13-02/ffmpeg-N-116752-g507c2a5774-win64-gpl.zip";

/// Inputs for building the catalog.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Directory managed binaries are installed into
    pub resources_dir: PathBuf,
    pub ytdlp_version: String,
    pub client: reqwest::Client,
}

impl CatalogOptions {
    pub fn new(resources_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
            ytdlp_version: DEFAULT_YTDLP_VERSION.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

/// yt-dlp release asset for the current platform, if one is published.
fn ytdlp_asset() -> Option<&'static str> {
    if cfg!(target_os = "windows") {
        Some("yt-dlp.exe")
    } else if cfg!(target_os = "linux") && cfg!(target_arch = "x86_64") {
        Some("yt-dlp_linux")
    } else if cfg!(target_os = "linux") && cfg!(target_arch = "aarch64") {
        Some("yt-dlp_linux_aarch64")
    } else if cfg!(target_os = "macos") {
        Some("yt-dlp_macos")
    } else {
        None
    }
}

fn exe(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn ffmpeg_dir(options: &CatalogOptions) -> PathBuf {
    options.resources_dir.join("ffmpeg")
}

/// Resources to verify, in registration order: yt-dlp, then FFmpeg.
pub fn default_resources(options: &CatalogOptions) -> Vec<Resource> {
    let tools = default_tool_paths(options);

    let ytdlp = match ytdlp_asset() {
        Some(asset) => {
            let url = format!("{}/{}/{}", YTDLP_RELEASES, options.ytdlp_version, asset);
            let installer: Arc<dyn Installer> =
                Arc::new(BinaryDownload::new(options.client.clone(), url));
            Resource::new("yt-dlp", "yt-dlp", &tools.ytdlp, installer)
                .with_version(&options.ytdlp_version)
        }
        None => Resource::new("yt-dlp", "yt-dlp", &tools.ytdlp, Arc::new(SystemPath::new("yt-dlp"))),
    };

    let ffmpeg = if cfg!(target_os = "windows") {
        let installer = ArchiveDownload::new(
            options.client.clone(),
            FFMPEG_WIN64_URL,
            &options.resources_dir,
            vec![
                ArchiveEntry::new("/bin/ffmpeg.exe", &tools.ffmpeg),
                ArchiveEntry::new("/bin/ffprobe.exe", &tools.ffprobe),
            ],
        );
        Resource::new("ffmpeg", "FFmpeg", &tools.ffmpeg, Arc::new(installer))
            .with_version_arg("-version")
            .with_companion(&tools.ffprobe)
    } else {
        Resource::new("ffmpeg", "FFmpeg", &tools.ffmpeg, Arc::new(SystemPath::new("ffmpeg")))
            .with_version_arg("-version")
            .with_companion(&tools.ffprobe)
    };

    vec![ytdlp, ffmpeg]
}

/// Where jobs find the tools once the catalog is verified.
pub fn default_tool_paths(options: &CatalogOptions) -> ToolPaths {
    let ytdlp = match ytdlp_asset() {
        Some(_) => options.resources_dir.join(exe("yt-dlp")),
        None => PathBuf::from("yt-dlp"),
    };
    if cfg!(target_os = "windows") {
        let dir = ffmpeg_dir(options);
        ToolPaths::new(ytdlp, dir.join(exe("ffmpeg")), dir.join(exe("ffprobe")))
    } else {
        ToolPaths::new(ytdlp, "ffmpeg", "ffprobe")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_and_keys() {
        let options = CatalogOptions::new("/home/u/.ytclip/resources");
        let resources = default_resources(&options);
        let names: Vec<_> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["yt-dlp", "ffmpeg"]);
        assert_eq!(resources[1].title, "FFmpeg");
        assert_eq!(resources[1].companions.len(), 1);
    }

    #[test]
    fn test_catalog_matches_tool_paths() {
        let options = CatalogOptions::new("/data/resources");
        let resources = default_resources(&options);
        let tools = default_tool_paths(&options);
        assert_eq!(resources[0].expected_path, tools.ytdlp);
        assert_eq!(resources[1].expected_path, tools.ffmpeg);
        assert_eq!(resources[1].companions[0], tools.ffprobe);
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_ytdlp_is_pinned_download() {
        let mut options = CatalogOptions::new("/data/resources");
        options.ytdlp_version = "2025.01.15".to_string();
        let resources = default_resources(&options);
        assert_eq!(resources[0].required_version.as_deref(), Some("2025.01.15"));
        assert_eq!(resources[0].expected_path, PathBuf::from("/data/resources/yt-dlp"));
        let debug = format!("{:?}", resources[0].installer);
        assert!(debug.contains("/2025.01.15/yt-dlp_"));
    }
}
