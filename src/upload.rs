use crate::error::{Result, SmartSafeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Cloud object storage seam for recording artifacts.
///
/// Callers treat uploads as fire-and-forget: failures are logged locally and
/// the artifact is left on disk. The real S3 client lives behind this trait.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Store the file under the given object key
    async fn upload(&self, local_path: &Path, key: &str) -> Result<()>;
}

/// Filesystem-backed sink: copies artifacts into a bucket directory.
/// Used for local runs and tests.
pub struct FsUploadSink {
    bucket_dir: PathBuf,
}

impl FsUploadSink {
    pub fn new<P: Into<PathBuf>>(bucket_dir: P) -> Self {
        Self {
            bucket_dir: bucket_dir.into(),
        }
    }
}

#[async_trait]
impl UploadSink for FsUploadSink {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<()> {
        let target = self.bucket_dir.join(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SmartSafeError::Upload {
                    key: key.to_string(),
                    details: format!("failed to create {}: {}", parent.display(), e),
                })?;
        }

        debug!(
            "Uploading {} -> {}",
            local_path.display(),
            target.display()
        );
        fs::copy(local_path, &target)
            .await
            .map_err(|e| SmartSafeError::Upload {
                key: key.to_string(),
                details: e.to_string(),
            })?;

        info!("Upload successful: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upload_copies_under_key() {
        let source_dir = tempdir().unwrap();
        let bucket_dir = tempdir().unwrap();

        let artifact = source_dir.path().join("cam1_log_test.mp4");
        fs::write(&artifact, b"video bytes").await.unwrap();

        let sink = FsUploadSink::new(bucket_dir.path());
        sink.upload(&artifact, "picamera1/cam1_log_test.mp4")
            .await
            .unwrap();

        let stored = bucket_dir.path().join("picamera1/cam1_log_test.mp4");
        assert_eq!(fs::read(&stored).await.unwrap(), b"video bytes");
        // Source is left in place; deletion is the caller's decision
        assert!(artifact.exists());
    }

    #[tokio::test]
    async fn test_upload_missing_file_errors() {
        let bucket_dir = tempdir().unwrap();
        let sink = FsUploadSink::new(bucket_dir.path());

        let result = sink
            .upload(Path::new("/nonexistent/file.mp4"), "picamera1/file.mp4")
            .await;
        assert!(matches!(result, Err(SmartSafeError::Upload { .. })));
    }
}
