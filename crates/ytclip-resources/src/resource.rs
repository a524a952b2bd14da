//! Resource descriptors and lifecycle state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::installer::Installer;

/// An external binary the backend needs, and how to obtain it.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Stable key, also used as the event key
    pub name: String,
    /// Human label for progress events
    pub title: String,
    pub expected_path: PathBuf,
    /// Minimum dotted version reported by `version_arg`
    pub required_version: Option<String>,
    /// Hex SHA-256 of the binary at `expected_path`
    pub checksum: Option<String>,
    pub version_arg: String,
    /// Other binaries the same installer provides
    pub companions: Vec<PathBuf>,
    pub installer: Arc<dyn Installer>,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        expected_path: impl Into<PathBuf>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            expected_path: expected_path.into(),
            required_version: None,
            checksum: None,
            version_arg: "--version".to_string(),
            companions: Vec::new(),
            installer,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.required_version = Some(version.into());
        self
    }

    pub fn with_checksum(mut self, sha256: impl Into<String>) -> Self {
        self.checksum = Some(sha256.into());
        self
    }

    pub fn with_version_arg(mut self, arg: impl Into<String>) -> Self {
        self.version_arg = arg.into();
        self
    }

    pub fn with_companion(mut self, path: impl Into<PathBuf>) -> Self {
        self.companions.push(path.into());
        self
    }
}

/// Where a resource stands in the current process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ResourceState {
    #[default]
    Unchecked,
    Missing,
    Installing,
    Verified,
    Failed(String),
}

impl ResourceState {
    pub fn is_verified(&self) -> bool {
        matches!(self, ResourceState::Verified)
    }
}
