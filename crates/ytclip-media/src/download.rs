//! Media download via yt-dlp.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::command::{ProgressPipe, ToolRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::find_by_stem;
use crate::progress::parse_ytdlp_progress;

/// Format sort used when none is configured: cap at 480p, prefer higher fps.
pub const DEFAULT_FORMAT_SORT: &str = "res:480,fps";

/// yt-dlp invocation settings.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    format_sort: String,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ffmpeg_location: None,
            format_sort: DEFAULT_FORMAT_SORT.to_string(),
        }
    }

    /// FFmpeg binary yt-dlp should use for merging streams.
    pub fn with_ffmpeg_location(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(ffmpeg.into());
        self
    }

    pub fn with_format_sort(mut self, sort: impl Into<String>) -> Self {
        self.format_sort = sort.into();
        self
    }

    /// Arguments for downloading `url` into `dest_dir/<stem>.<ext>`.
    pub fn build_args(&self, url: &str, dest_dir: &Path, stem: &str) -> Vec<String> {
        let template = dest_dir.join(format!("{}.%(ext)s", stem));
        let mut args = vec![
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--force-overwrites".to_string(),
            "-S".to_string(),
            self.format_sort.clone(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ];
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().to_string());
        }
        args.push("-o".to_string());
        args.push(template.to_string_lossy().to_string());
        // Keeps a URL starting with '-' from being read as an option.
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Download `url` and return the path of the file yt-dlp produced.
    ///
    /// `on_progress` receives the percentage from each `[download]` line.
    pub async fn download<F>(
        &self,
        url: &str,
        dest_dir: &Path,
        stem: &str,
        runner: &ToolRunner,
        on_progress: F,
    ) -> MediaResult<PathBuf>
    where
        F: Fn(f64) + Send + 'static,
    {
        tokio::fs::create_dir_all(dest_dir).await?;
        let args = self.build_args(url, dest_dir, stem);

        info!(url = %url, dest = %dest_dir.display(), "Downloading media");

        let result = runner
            .run(&self.binary, &args, ProgressPipe::Stdout, move |line| {
                if let Some(pct) = parse_ytdlp_progress(line) {
                    on_progress(pct);
                }
            })
            .await;

        match result {
            Ok(_) => {}
            Err(MediaError::ToolFailed {
                message, stderr, ..
            }) => {
                let stderr = stderr.unwrap_or_default();
                debug!("yt-dlp stderr: {}", stderr);
                return Err(classify_failure(&stderr, &message));
            }
            Err(e) => return Err(e),
        }

        let output = find_by_stem(dest_dir, stem)
            .await?
            .ok_or_else(|| MediaError::download_failed("Output file not created"))?;

        let size = tokio::fs::metadata(&output).await?.len();
        info!(
            output = %output.display(),
            size_mb = size as f64 / (1024.0 * 1024.0),
            "Downloaded media successfully"
        );
        Ok(output)
    }
}

/// Map yt-dlp's stderr to a specific failure.
pub fn classify_failure(stderr: &str, last_line: &str) -> MediaError {
    let error_line = stderr
        .lines()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .unwrap_or(last_line)
        .trim()
        .to_string();

    if stderr.contains("Unsupported URL") || stderr.contains("is not a valid URL") {
        return MediaError::UnsupportedUrl(error_line);
    }

    const REJECTIONS: [&str; 10] = [
        "HTTP Error 4",
        "Private video",
        "Video unavailable",
        "This video is not available",
        "This video is unavailable",
        "Sign in to confirm",
        "members-only",
        "has been removed",
        "not available in your country",
        "Too Many Requests",
    ];
    if REJECTIONS.iter().any(|needle| stderr.contains(needle)) {
        warn!(reason = %error_line, "Remote rejected download");
        return MediaError::RemoteRejected(error_line);
    }

    MediaError::download_failed(format!("yt-dlp failed: {}", error_line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let ytdlp = YtDlp::new("/res/yt-dlp").with_ffmpeg_location("/res/ffmpeg");
        let args = ytdlp.build_args("https://example.com/v/1", Path::new("/tmp/job"), "abc");

        let sort = args.iter().position(|a| a == "-S").unwrap();
        assert_eq!(args[sort + 1], "res:480,fps");
        let loc = args.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(args[loc + 1], "/res/ffmpeg");
        let out = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[out + 1], "/tmp/job/abc.%(ext)s");
        assert!(args.contains(&"--newline".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--", "https://example.com/v/1"]);
    }

    #[test]
    fn test_custom_format_sort() {
        let args = YtDlp::new("yt-dlp")
            .with_format_sort("res:720")
            .build_args("https://example.com", Path::new("/tmp"), "x");
        assert!(args.contains(&"res:720".to_string()));
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
    }

    #[test]
    fn test_classify_unsupported() {
        let stderr = "ERROR: Unsupported URL: https://example.com/nothing";
        assert!(matches!(
            classify_failure(stderr, stderr),
            MediaError::UnsupportedUrl(msg) if msg.contains("example.com")
        ));
    }

    #[test]
    fn test_classify_rejections() {
        for stderr in [
            "ERROR: [youtube] abc: Private video. Sign in if you've been granted access",
            "ERROR: unable to download video data: HTTP Error 403: Forbidden",
            "ERROR: [youtube] abc: Video unavailable",
        ] {
            assert!(
                matches!(classify_failure(stderr, ""), MediaError::RemoteRejected(_)),
                "{stderr}"
            );
        }
    }

    #[test]
    fn test_classify_generic_failure_uses_error_line() {
        let stderr = "[info] something\nERROR: disk quota exceeded\nmore noise";
        match classify_failure(stderr, "more noise") {
            MediaError::DownloadFailed { message } => {
                assert_eq!(message, "yt-dlp failed: ERROR: disk quota exceeded")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_with_fake_binary() {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::{Arc, Mutex};

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("yt-dlp");
        // Writes the file named by the -o template and reports progress.
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             while [ \"$1\" != \"-o\" ]; do shift; done\n\
             out=$(echo \"$2\" | sed 's/%(ext)s/mp4/')\n\
             echo '[download]  50.0% of 1.00MiB'\n\
             echo '[download] 100% of 1.00MiB'\n\
             printf data > \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dest = dir.path().join("temp");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let path = YtDlp::new(&script)
            .download(
                "https://example.com/v/1",
                &dest,
                "job1",
                &ToolRunner::new(),
                move |pct| sink.lock().unwrap().push(pct),
            )
            .await
            .unwrap();

        assert_eq!(path, dest.join("job1.mp4"));
        assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);
    }
}
