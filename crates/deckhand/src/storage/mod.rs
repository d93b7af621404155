pub mod filesystem;

use async_trait::async_trait;

use crate::error::StorageError;

pub use filesystem::LocalArtifactStore;

/// Where uploads and generated artifacts live.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores an uploaded input and returns its locator.
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError>;

    async fn read(&self, locator: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes a generated artifact, replacing any previous one with that name.
    async fn write_output(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Removes an artifact. Removing a missing artifact succeeds.
    async fn remove(&self, locator: &str) -> Result<(), StorageError>;
}

/// Guesses a MIME type from a locator or filename.
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
