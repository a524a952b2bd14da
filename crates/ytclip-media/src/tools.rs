//! Locations of the external binaries.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Paths of the three tools a job needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    pub fn new(
        ytdlp: impl Into<PathBuf>,
        ffmpeg: impl Into<PathBuf>,
        ffprobe: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ytdlp: ytdlp.into(),
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Bare names, looked up on `PATH` at launch.
    pub fn system() -> Self {
        Self::new("yt-dlp", "ffmpeg", "ffprobe")
    }

    /// Confirm every tool can still be launched.
    pub fn check(&self) -> MediaResult<()> {
        for (tool, path) in [
            ("yt-dlp", &self.ytdlp),
            ("ffmpeg", &self.ffmpeg),
            ("ffprobe", &self.ffprobe),
        ] {
            if resolve_program(path).is_none() {
                return Err(MediaError::ToolNotFound {
                    tool: tool.to_string(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Resolve a program to an executable path.
///
/// Paths with a directory component must exist as given; bare names are
/// searched on `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        program.is_file().then(|| program.to_path_buf())
    } else {
        which::which(program).ok()
    }
}
