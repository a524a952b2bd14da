//! Presence, version and checksum checks for a resource.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use ytclip_media::resolve_program;

use crate::checksum::{digest_matches, sha256_file};
use crate::error::{ResourceError, ResourceResult};
use crate::progress::{steps, ProgressReporter};
use crate::resource::Resource;
use crate::version::{probe_version, satisfies};

/// Makes sure a resource is present and current, installing it if not.
#[async_trait]
pub trait ResourceVerifier: Send + Sync {
    async fn ensure(&self, resource: &Resource, progress: &ProgressReporter) -> ResourceResult<()>;
}

/// Why a present resource is not acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Version {
        required: String,
        found: Option<String>,
    },
    Checksum {
        expected: String,
        actual: String,
    },
}

/// Outcome of inspecting a resource on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    Current,
    Missing(PathBuf),
    Stale(Staleness),
}

/// Verifier for real binaries on disk.
#[derive(Debug, Clone, Default)]
pub struct ToolVerifier {
    install_timeout: Option<Duration>,
}

impl ToolVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each installation; unset means unbounded.
    pub fn with_install_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.install_timeout = timeout;
        self
    }

    /// Check presence, then the version and checksum policy.
    pub async fn inspect(&self, resource: &Resource) -> ResourceResult<Inspection> {
        let Some(binary) = resolve_program(&resource.expected_path) else {
            return Ok(Inspection::Missing(resource.expected_path.clone()));
        };
        if let Some(missing) = resource
            .companions
            .iter()
            .find(|c| resolve_program(c).is_none())
        {
            return Ok(Inspection::Missing(missing.clone()));
        }

        if let Some(required) = &resource.required_version {
            let found = probe_version(&binary, &resource.version_arg).await;
            let current = found.as_deref().is_some_and(|v| satisfies(v, required));
            debug!(resource = %resource.name, ?found, required = %required, "Version check");
            if !current {
                return Ok(Inspection::Stale(Staleness::Version {
                    required: required.clone(),
                    found,
                }));
            }
        }

        if let Some(expected) = &resource.checksum {
            let actual = sha256_file(&binary).await?;
            if !digest_matches(expected, &actual) {
                return Ok(Inspection::Stale(Staleness::Checksum {
                    expected: expected.to_lowercase(),
                    actual,
                }));
            }
        }

        Ok(Inspection::Current)
    }

    async fn install(&self, resource: &Resource, progress: &ProgressReporter) -> ResourceResult<()> {
        let install = resource.installer.install(resource, progress);
        match self.install_timeout {
            Some(limit) => tokio::time::timeout(limit, install).await.map_err(|_| {
                ResourceError::network(format!(
                    "Installing {} timed out after {} seconds",
                    resource.name,
                    limit.as_secs()
                ))
            })?,
            None => install.await,
        }
    }
}

#[async_trait]
impl ResourceVerifier for ToolVerifier {
    async fn ensure(&self, resource: &Resource, progress: &ProgressReporter) -> ResourceResult<()> {
        progress.report(steps::CHECKING, 0.0);

        match self.inspect(resource).await? {
            Inspection::Current => {
                debug!(resource = %resource.name, "Already present and current");
                progress.report(steps::READY, 100.0);
                return Ok(());
            }
            Inspection::Missing(path) => {
                info!(resource = %resource.name, path = %path.display(), "Missing, installing");
                progress.report(steps::NOT_FOUND, 0.0);
            }
            Inspection::Stale(reason) => {
                info!(resource = %resource.name, ?reason, "Stale, reinstalling");
                progress.report(steps::OUTDATED, 0.0);
            }
        }

        self.install(resource, &progress.scaled(0.0, 95.0)).await?;
        progress.report(steps::VERIFYING, 95.0);

        match self.inspect(resource).await? {
            Inspection::Current => {
                progress.report(steps::READY, 100.0);
                Ok(())
            }
            Inspection::Missing(path) => {
                warn!(resource = %resource.name, path = %path.display(), "Still missing after install");
                Err(ResourceError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found after install", path.display()),
                )))
            }
            Inspection::Stale(Staleness::Version { required, found }) => {
                Err(ResourceError::VersionMismatch {
                    name: resource.name.clone(),
                    required,
                    found,
                })
            }
            Inspection::Stale(Staleness::Checksum { expected, actual }) => {
                Err(ResourceError::ChecksumMismatch {
                    path: resource.expected_path.clone(),
                    expected,
                    actual,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::Installer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Writes fixed contents to the expected path.
    #[derive(Debug, Default)]
    struct WriteFile {
        contents: Vec<u8>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Installer for WriteFile {
        async fn install(&self, resource: &Resource, _: &ProgressReporter) -> ResourceResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(&resource.expected_path, &self.contents).await?;
            Ok(())
        }
    }

    // sha256("hello")
    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[tokio::test]
    async fn test_missing_then_installed() {
        let dir = tempfile::tempdir().unwrap();
        let installer = Arc::new(WriteFile {
            contents: b"hello".to_vec(),
            ..Default::default()
        });
        let resource = Resource::new("tool", "Tool", dir.path().join("tool"), installer.clone())
            .with_checksum(HELLO);

        let verifier = ToolVerifier::new();
        assert!(matches!(
            verifier.inspect(&resource).await.unwrap(),
            Inspection::Missing(_)
        ));
        verifier
            .ensure(&resource, &ProgressReporter::noop())
            .await
            .unwrap();
        assert_eq!(installer.calls.load(Ordering::SeqCst), 1);

        // Present and current: no second install.
        verifier
            .ensure(&resource, &ProgressReporter::noop())
            .await
            .unwrap();
        assert_eq!(installer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_every_successful_ensure_ends_at_100() {
        let dir = tempfile::tempdir().unwrap();
        let resource = Resource::new(
            "tool",
            "Tool",
            dir.path().join("tool"),
            Arc::new(WriteFile {
                contents: b"hello".to_vec(),
                ..Default::default()
            }),
        )
        .with_checksum(HELLO);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let reporter = {
            let seen = Arc::clone(&seen);
            ProgressReporter::new(move |step, pct| seen.lock().unwrap().push((step.to_string(), pct)))
        };

        let verifier = ToolVerifier::new();
        for _ in 0..2 {
            seen.lock().unwrap().clear();
            verifier.ensure(&resource, &reporter).await.unwrap();
            let last = seen.lock().unwrap().last().cloned();
            assert_eq!(last, Some((steps::READY.to_string(), 100.0)));
        }
    }

    #[tokio::test]
    async fn test_checksum_still_wrong_after_install() {
        let dir = tempfile::tempdir().unwrap();
        let installer = Arc::new(WriteFile {
            contents: b"tampered".to_vec(),
            ..Default::default()
        });
        let resource =
            Resource::new("tool", "Tool", dir.path().join("tool"), installer).with_checksum(HELLO);

        let err = ToolVerifier::new()
            .ensure(&resource, &ProgressReporter::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn test_missing_companion_triggers_install() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("ffmpeg");
        std::fs::write(&tool, b"hello").unwrap();
        let resource = Resource::new("ffmpeg", "FFmpeg", &tool, Arc::new(WriteFile::default()))
            .with_companion(dir.path().join("ffprobe"));

        assert_eq!(
            ToolVerifier::new().inspect(&resource).await.unwrap(),
            Inspection::Missing(dir.path().join("ffprobe"))
        );
    }

    #[derive(Debug)]
    struct Hang;

    #[async_trait]
    impl Installer for Hang {
        async fn install(&self, _: &Resource, _: &ProgressReporter) -> ResourceResult<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_install_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let resource = Resource::new("tool", "Tool", dir.path().join("tool"), Arc::new(Hang));
        let err = ToolVerifier::new()
            .with_install_timeout(Some(Duration::from_millis(50)))
            .ensure(&resource, &ProgressReporter::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NetworkError(msg) if msg.contains("timed out")));
    }
}
