//! Filesystem helpers for job working directories.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Suffixes of files yt-dlp is still writing or has abandoned.
const PARTIAL_SUFFIXES: [&str; 3] = [".part", ".ytdl", ".temp"];

/// Find the finished file named `<stem>.<ext>` in `dir`.
pub async fn find_by_stem(dir: &Path, stem: &str) -> MediaResult<Option<PathBuf>> {
    let prefix = format!("{}.", stem);
    let mut entries = fs::read_dir(dir).await?;
    let mut found: Option<(PathBuf, u64)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with(&prefix) || PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        // Leftover per-stream files share the stem; the merged output is the largest.
        if found.as_ref().map_or(true, |(_, size)| meta.len() > *size) {
            found = Some((entry.path(), meta.len()));
        }
    }

    Ok(found.map(|(path, _)| path))
}

/// Move `src` to `dst`, creating the parent and copying across devices.
pub async fn move_file(src: &Path, dst: &Path) -> MediaResult<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            let staging = dst.with_extension("moving");
            fs::copy(src, &staging).await?;
            fs::rename(&staging, dst).await?;
            fs::remove_file(src).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn is_cross_device(e: &std::io::Error) -> bool {
    // EXDEV on Linux and macOS
    e.raw_os_error() == Some(18)
}

/// Remove a working directory, logging instead of failing.
pub async fn remove_dir_quietly(dir: &Path) {
    match fs::remove_dir_all(dir).await {
        Ok(()) => debug!(dir = %dir.display(), "Removed working directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), "Failed to remove working directory: {}", e),
    }
}
