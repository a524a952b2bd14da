//! Provisioning of the external tools the backend drives.
//!
//! This crate provides:
//! - The [`Resource`] catalog and per-resource [`ResourceState`]
//! - [`ResourceVerifier`]: presence, version and checksum policy, installing when stale
//! - [`Installer`] implementations: direct binary, zip archive, system `PATH`
//! - [`ResourceManager`]: the concurrent verification pass and the readiness flag

pub mod catalog;
pub mod checksum;
pub mod error;
pub mod installer;
pub mod manager;
pub mod metrics;
pub mod progress;
pub mod readiness;
pub mod resource;
pub mod verifier;
pub mod version;

pub use catalog::{default_resources, default_tool_paths, CatalogOptions, DEFAULT_YTDLP_VERSION};
pub use error::{ResourceError, ResourceResult};
pub use installer::{ArchiveDownload, ArchiveEntry, BinaryDownload, Installer, SystemPath};
pub use manager::ResourceManager;
pub use progress::ProgressReporter;
pub use readiness::{ReadinessFlag, ReadinessHandle};
pub use resource::{Resource, ResourceState};
pub use verifier::{Inspection, ResourceVerifier, Staleness, ToolVerifier};
