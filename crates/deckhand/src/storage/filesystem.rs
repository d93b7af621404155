use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::sanitize::{redact_path, safe_filename};
use crate::storage::ArtifactStore;

const UPLOADS: &str = "uploads";
const OUTPUTS: &str = "outputs";

/// Artifact store over two local directories.
///
/// Locators are `uploads/<file>` or `outputs/<file>` regardless of where the
/// roots live on disk, so they are safe to hand to clients.
pub struct LocalArtifactStore {
    upload_directory: PathBuf,
    output_directory: PathBuf,
}

impl LocalArtifactStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(upload_directory: P, output_directory: Q) -> Self {
        Self {
            upload_directory: upload_directory.as_ref().to_path_buf(),
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn upload_directory(&self) -> &Path {
        &self.upload_directory
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Resolves a locator to a path inside one of the roots.
    pub fn resolve(&self, locator: &str) -> Result<PathBuf, StorageError> {
        let (area, file) = locator
            .split_once('/')
            .ok_or_else(|| StorageError::OutsideRoot(locator.to_string()))?;

        if file.is_empty() || file.starts_with('.') || safe_filename(file) != file {
            return Err(StorageError::OutsideRoot(locator.to_string()));
        }

        let root = match area {
            UPLOADS => &self.upload_directory,
            OUTPUTS => &self.output_directory,
            _ => return Err(StorageError::OutsideRoot(locator.to_string())),
        };
        Ok(root.join(file))
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })
    }

    async fn write_into(
        &self,
        area: &str,
        root: &Path,
        file: String,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        self.ensure_directory(root).await?;

        let path = root.join(&file);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), redact_path(&path));
        Ok(format!("{}/{}", area, file))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let file = format!("{}_{}", uuid::Uuid::new_v4().simple(), safe_filename(name));
        self.write_into(UPLOADS, &self.upload_directory, file, bytes)
            .await
    }

    async fn read(&self, locator: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(locator)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(locator.to_string())
            } else {
                StorageError::ReadFile { path, source: e }
            }
        })
    }

    async fn write_output(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.write_into(OUTPUTS, &self.output_directory, safe_filename(name), bytes)
            .await
    }

    async fn remove(&self, locator: &str) -> Result<(), StorageError> {
        let path = self.resolve(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::debug!("Removed {}", redact_path(&path));
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }
}
