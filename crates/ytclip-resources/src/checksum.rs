//! SHA-256 helpers.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{ResourceError, ResourceResult};

/// Hex SHA-256 of the file at `path`.
pub async fn sha256_file(path: &Path) -> ResourceResult<String> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut file = std::fs::File::open(&owned)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| ResourceError::Io(std::io::Error::other(e)))?
    .map_err(|e| ResourceError::io_at(path, e))
}

/// Case-insensitive comparison of hex digests.
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Fail with [`ResourceError::ChecksumMismatch`] unless `actual` matches.
pub fn verify_digest(path: &Path, expected: Option<&str>, actual: &str) -> ResourceResult<()> {
    match expected {
        Some(expected) if !digest_matches(expected, actual) => Err(ResourceError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_lowercase(),
            actual: actual.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello")
    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[tokio::test]
    async fn test_sha256_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(sha256_file(&path).await.unwrap(), HELLO);
    }

    #[tokio::test]
    async fn test_sha256_missing_file() {
        let err = sha256_file(Path::new("/no/such/file")).await.unwrap_err();
        assert!(matches!(err, ResourceError::Io(_)));
    }

    #[test]
    fn test_verify_digest() {
        let path = Path::new("f");
        assert!(verify_digest(path, None, HELLO).is_ok());
        assert!(verify_digest(path, Some(&HELLO.to_uppercase()), HELLO).is_ok());
        assert!(matches!(
            verify_digest(path, Some("00"), HELLO),
            Err(ResourceError::ChecksumMismatch { .. })
        ));
    }
}
