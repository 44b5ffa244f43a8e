//! Markdown document output.

use crate::error::ArchiveError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Create every directory in `dirs`. Existing directories are fine.
#[instrument(level = "debug", skip_all)]
pub async fn ensure_directories<P: AsRef<Path>>(dirs: &[P]) -> Result<(), ArchiveError> {
    for dir in dirs {
        let dir = dir.as_ref();
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(path = %dir.display(), error = %e, "Failed to create directory");
            return Err(ArchiveError::io(dir, e));
        }
    }
    Ok(())
}

/// Create or overwrite the document at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_document(path: &Path, content: &str) -> Result<PathBuf, ArchiveError> {
    if let Some(parent) = path.parent() {
        ensure_directories(&[parent]).await?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| ArchiveError::io(path, e))?;
    info!(bytes = content.len(), "Wrote document");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_directories_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = [dir.path().join("articles"), dir.path().join("images")];

        ensure_directories(&dirs).await.unwrap();
        ensure_directories(&dirs).await.unwrap();

        assert!(dirs.iter().all(|d| d.is_dir()));
    }

    #[tokio::test]
    async fn test_write_document_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2021").join("05").join("post").join("index.md");

        write_document(&path, "first").await.unwrap();
        write_document(&path, "second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_unwritable_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = write_document(&blocker.join("index.md"), "body").await.unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }
}
