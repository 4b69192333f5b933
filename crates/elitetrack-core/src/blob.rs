//! Photo storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::error::{Result, TrackerError};

/// Bucket holding step evidence photos.
pub const STEP_PHOTOS_BUCKET: &str = "step-photos";

/// Uploads files and returns the public URL to store on a record.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, logical_path: &str) -> Result<String>;
}

/// Logical path of a step photo: `step-photos/step_<id>/<millis>_<name>`.
pub fn step_photo_path(step_id: &str, millis: i64, file_name: &str) -> String {
    let name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{STEP_PHOTOS_BUCKET}/step_{step_id}/{millis}_{name}")
}

/// Stores blobs under a local directory and hands out `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Default location: `$XDG_DATA_HOME/elitetrack/blobs`.
    pub fn default_root() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("elitetrack")
            .create_data_directory("blobs")
            .map_err(|e| TrackerError::XdgDirectory(e.to_string()))
    }

    fn resolve(&self, logical_path: &str) -> Result<PathBuf> {
        let relative = Path::new(logical_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(TrackerError::validation("logical_path")
                .with_reason(format!("'{logical_path}' escapes the blob root")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, bytes: Vec<u8>, logical_path: &str) -> Result<String> {
        let target = self.resolve(logical_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TrackerError::FileSystem {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| TrackerError::FileSystem {
                path: target.clone(),
                source: e,
            })?;
        debug!("stored blob {}", target.display());
        Ok(format!("file://{}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_step_photo_path_sanitizes_name() {
        assert_eq!(
            step_photo_path("stp_3", 1_700_000_000_000, "front door.jpg"),
            "step-photos/step_stp_3/1700000000000_front_door.jpg"
        );
    }

    #[tokio::test]
    async fn test_fs_upload_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let url = store
            .upload(b"jpeg".to_vec(), "step-photos/step_stp_1/1_a.jpg")
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        let written = std::fs::read(dir.path().join("step-photos/step_stp_1/1_a.jpg")).unwrap();
        assert_eq!(written, b"jpeg");
    }

    #[tokio::test]
    async fn test_fs_upload_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.upload(vec![], "../outside.jpg").await.is_err());
    }
}
