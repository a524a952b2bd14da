//! Resource provisioning errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ResourceResult<T> = Result<T, ResourceError>;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Permission denied: {}: {message}", .path.display())]
    PermissionDenied { path: PathBuf, message: String },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("{name} version {} does not satisfy {required}", .found.as_deref().unwrap_or("unknown"))]
    VersionMismatch {
        name: String,
        required: String,
        found: Option<String>,
    },

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResourceError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError(message.into())
    }

    /// Wrap an IO error on `path`, surfacing permission problems.
    pub fn io_at(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        } else {
            Self::Io(err)
        }
    }
}

impl From<reqwest::Error> for ResourceError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

impl From<zip::result::ZipError> for ResourceError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::InvalidArchive(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_at_maps_permission_denied() {
        let err = ResourceError::io_at(
            Path::new("/res/yt-dlp"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, ResourceError::PermissionDenied { .. }));

        let err = ResourceError::io_at(
            Path::new("/res/yt-dlp"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, ResourceError::Io(_)));
    }

    #[test]
    fn test_version_mismatch_message() {
        let err = ResourceError::VersionMismatch {
            name: "yt-dlp".into(),
            required: "2024.05.27".into(),
            found: None,
        };
        assert_eq!(
            err.to_string(),
            "yt-dlp version unknown does not satisfy 2024.05.27"
        );
    }
}
