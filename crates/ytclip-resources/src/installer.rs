//! Ways of putting a resource's binary in place.

use async_trait::async_trait;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::checksum::verify_digest;
use crate::error::{ResourceError, ResourceResult};
use crate::progress::{steps, ProgressReporter};
use crate::resource::Resource;

/// Installs the binary (and companions) of a resource.
#[async_trait]
pub trait Installer: Send + Sync + fmt::Debug {
    async fn install(&self, resource: &Resource, progress: &ProgressReporter) -> ResourceResult<()>;
}

/// Downloads a single executable.
#[derive(Debug, Clone)]
pub struct BinaryDownload {
    pub url: String,
    /// Expected hex SHA-256 of the download
    pub sha256: Option<String>,
    client: reqwest::Client,
}

impl BinaryDownload {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sha256: None,
            client,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

#[async_trait]
impl Installer for BinaryDownload {
    async fn install(&self, resource: &Resource, progress: &ProgressReporter) -> ResourceResult<()> {
        let dest = &resource.expected_path;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ResourceError::io_at(parent, e))?;
        }

        let part = with_suffix(dest, ".part");
        let digest = download_to(&self.client, &self.url, &part, &progress.scaled(0.0, 95.0)).await?;
        if let Err(e) = verify_digest(&part, self.sha256.as_deref(), &digest) {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }

        make_executable(&part).await?;
        replace_file(&part, dest).await?;
        progress.report(steps::INSTALLED, 100.0);

        info!(resource = %resource.name, path = %dest.display(), "Installed binary");
        Ok(())
    }
}

/// One file to pull out of an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Matched against the end of the entry's path, case-insensitively
    pub suffix: String,
    pub dest: PathBuf,
}

impl ArchiveEntry {
    pub fn new(suffix: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            suffix: suffix.into(),
            dest: dest.into(),
        }
    }
}

/// Downloads a zip and extracts selected entries.
#[derive(Debug, Clone)]
pub struct ArchiveDownload {
    pub url: String,
    pub sha256: Option<String>,
    pub entries: Vec<ArchiveEntry>,
    /// Where the archive is staged while extracting
    pub scratch_dir: PathBuf,
    client: reqwest::Client,
}

impl ArchiveDownload {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
        entries: Vec<ArchiveEntry>,
    ) -> Self {
        Self {
            url: url.into(),
            sha256: None,
            entries,
            scratch_dir: scratch_dir.into(),
            client,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

#[async_trait]
impl Installer for ArchiveDownload {
    async fn install(&self, resource: &Resource, progress: &ProgressReporter) -> ResourceResult<()> {
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| ResourceError::io_at(&self.scratch_dir, e))?;
        let archive = self.scratch_dir.join(format!("{}.zip", resource.name));

        let digest = download_to(&self.client, &self.url, &archive, &progress.scaled(0.0, 80.0)).await?;
        if let Err(e) = verify_digest(&archive, self.sha256.as_deref(), &digest) {
            let _ = tokio::fs::remove_file(&archive).await;
            return Err(e);
        }

        progress.scaled(80.0, 100.0).report(steps::EXTRACTING, 0.0);
        let entries = self.entries.clone();
        let zip_path = archive.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_entries(&zip_path, &entries))
            .await
            .map_err(|e| ResourceError::Io(std::io::Error::other(e)))?;

        let _ = tokio::fs::remove_file(&archive).await;
        let extracted = extracted?;

        for dest in &extracted {
            make_executable(dest).await?;
        }
        progress.scaled(80.0, 100.0).report(steps::EXTRACTING, 100.0);

        info!(resource = %resource.name, files = extracted.len(), "Installed from archive");
        Ok(())
    }
}

/// Accepts a binary already on `PATH`; cannot download anything.
#[derive(Debug, Clone)]
pub struct SystemPath {
    pub binary: String,
}

impl SystemPath {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Installer for SystemPath {
    async fn install(&self, resource: &Resource, progress: &ProgressReporter) -> ResourceResult<()> {
        match which::which(&self.binary) {
            Ok(path) => {
                debug!(resource = %resource.name, path = %path.display(), "Found on PATH");
                progress.report(steps::INSTALLED, 100.0);
                Ok(())
            }
            Err(_) => Err(ResourceError::UnsupportedPlatform(format!(
                "{} is not installed and cannot be downloaded on {}; install it and add it to PATH",
                self.binary,
                std::env::consts::OS
            ))),
        }
    }
}

/// Stream `url` into `dest`, returning the hex SHA-256 of the bytes written.
pub(crate) async fn download_to(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: &ProgressReporter,
) -> ResourceResult<String> {
    progress.report(steps::DOWNLOADING, 0.0);
    debug!(url, dest = %dest.display(), "Downloading");

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ResourceError::network(format!("GET {} returned {}", url, status)));
    }

    let total = response.content_length().filter(|n| *n > 0);
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| ResourceError::io_at(dest, e))?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut last_percent = -1_i64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| ResourceError::io_at(dest, e))?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;

        if let Some(total) = total {
            let percent = (downloaded as f64 / total as f64 * 100.0).min(100.0);
            if percent as i64 != last_percent {
                last_percent = percent as i64;
                progress.report(steps::DOWNLOADING, percent);
            }
        }
    }
    file.flush().await.map_err(|e| ResourceError::io_at(dest, e))?;

    if let Some(total) = total {
        if downloaded < total {
            return Err(ResourceError::network(format!(
                "Download of {} ended after {} of {} bytes",
                url, downloaded, total
            )));
        }
    }

    progress.report(steps::DOWNLOADING, 100.0);
    Ok(hex::encode(hasher.finalize()))
}

fn extract_entries(archive: &Path, entries: &[ArchiveEntry]) -> ResourceResult<Vec<PathBuf>> {
    let file = std::fs::File::open(archive).map_err(|e| ResourceError::io_at(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::with_capacity(entries.len());

    for wanted in entries {
        let suffix = wanted.suffix.replace('\\', "/").to_lowercase();
        let mut found = false;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            if !entry.is_file() {
                continue;
            }
            let name = entry.name().replace('\\', "/").to_lowercase();
            if !name.ends_with(&suffix) {
                continue;
            }

            if let Some(parent) = wanted.dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ResourceError::io_at(parent, e))?;
            }
            let part = with_suffix(&wanted.dest, ".part");
            let mut out = std::fs::File::create(&part).map_err(|e| ResourceError::io_at(&part, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| ResourceError::io_at(&part, e))?;
            drop(out);
            if wanted.dest.exists() {
                std::fs::remove_file(&wanted.dest)
                    .map_err(|e| ResourceError::io_at(&wanted.dest, e))?;
            }
            std::fs::rename(&part, &wanted.dest).map_err(|e| ResourceError::io_at(&wanted.dest, e))?;
            found = true;
            break;
        }
        if !found {
            return Err(ResourceError::InvalidArchive(format!(
                "{} has no entry ending in {}",
                archive.display(),
                wanted.suffix
            )));
        }
        extracted.push(wanted.dest.clone());
    }
    Ok(extracted)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

async fn replace_file(src: &Path, dest: &Path) -> ResourceResult<()> {
    // Windows refuses to rename over an existing file.
    if cfg!(windows) && tokio::fs::try_exists(dest).await.unwrap_or(false) {
        tokio::fs::remove_file(dest)
            .await
            .map_err(|e| ResourceError::io_at(dest, e))?;
    }
    tokio::fs::rename(src, dest)
        .await
        .map_err(|e| ResourceError::io_at(dest, e))
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> ResourceResult<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| ResourceError::io_at(path, e))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> ResourceResult<()> {
    Ok(())
}
