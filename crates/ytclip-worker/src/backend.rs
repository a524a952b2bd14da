//! The media operations a download job drives.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ytclip_media::{
    clip_extension, clip_media, probe_duration, MediaResult, ToolPaths, ToolRunner, YtDlp,
};
use ytclip_models::{EncodingConfig, TimeWindow};

/// Progress callback, percent 0-100.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Fetch, probe and clip. Implemented over the real tools by
/// [`ToolchainBackend`]; tests substitute their own.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Confirm the tools can still be launched.
    async fn check_tools(&self) -> MediaResult<()>;

    /// Download `url` into `dest_dir`, naming the file `<stem>.<ext>`.
    async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        stem: &str,
        runner: &ToolRunner,
        on_progress: ProgressFn,
    ) -> MediaResult<PathBuf>;

    /// Duration of `media` in seconds.
    async fn probe_duration(&self, media: &Path) -> MediaResult<f64>;

    /// Cut `window` out of `input` into `output`.
    async fn clip(
        &self,
        input: &Path,
        output: &Path,
        window: &TimeWindow,
        runner: &ToolRunner,
        on_progress: ProgressFn,
    ) -> MediaResult<()>;

    /// File extension of the clip produced from `input`.
    fn output_extension(&self, input: &Path) -> String;
}

/// yt-dlp, ffprobe and ffmpeg at the paths the resource pass verified.
#[derive(Debug, Clone)]
pub struct ToolchainBackend {
    tools: ToolPaths,
    ytdlp: YtDlp,
    encoding: EncodingConfig,
}

impl ToolchainBackend {
    pub fn new(tools: ToolPaths, format_sort: impl Into<String>, encoding: EncodingConfig) -> Self {
        let ytdlp = YtDlp::new(&tools.ytdlp)
            .with_ffmpeg_location(&tools.ffmpeg)
            .with_format_sort(format_sort);
        Self {
            tools,
            ytdlp,
            encoding,
        }
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }
}

#[async_trait]
impl MediaBackend for ToolchainBackend {
    async fn check_tools(&self) -> MediaResult<()> {
        self.tools.check()
    }

    async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        stem: &str,
        runner: &ToolRunner,
        on_progress: ProgressFn,
    ) -> MediaResult<PathBuf> {
        self.ytdlp
            .download(url, dest_dir, stem, runner, move |pct| on_progress(pct))
            .await
    }

    async fn probe_duration(&self, media: &Path) -> MediaResult<f64> {
        probe_duration(&self.tools.ffprobe, media).await
    }

    async fn clip(
        &self,
        input: &Path,
        output: &Path,
        window: &TimeWindow,
        runner: &ToolRunner,
        on_progress: ProgressFn,
    ) -> MediaResult<()> {
        clip_media(
            &self.tools.ffmpeg,
            input,
            output,
            window,
            &self.encoding,
            runner,
            move |pct| on_progress(pct),
        )
        .await
    }

    fn output_extension(&self, input: &Path) -> String {
        clip_extension(input, &self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_extension_follows_encoding() {
        let reencode = ToolchainBackend::new(ToolPaths::system(), "res:480,fps", EncodingConfig::default());
        assert_eq!(reencode.output_extension(Path::new("/tmp/a.webm")), "mp4");

        let copy = ToolchainBackend::new(ToolPaths::system(), "res:480,fps", EncodingConfig::copy());
        assert_eq!(copy.output_extension(Path::new("/tmp/a.webm")), "webm");
    }

    #[tokio::test]
    async fn test_check_tools_reports_missing() {
        let tools = ToolPaths::new(
            "/nonexistent/yt-dlp",
            "/nonexistent/ffmpeg",
            "/nonexistent/ffprobe",
        );
        let backend = ToolchainBackend::new(tools, "res:480,fps", EncodingConfig::default());
        let err = backend.check_tools().await.unwrap_err();
        assert!(err.is_launch_failure());
    }
}
