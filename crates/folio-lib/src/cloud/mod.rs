pub mod dropbox;

use async_trait::async_trait;

use crate::errors::Result;
use dropbox::{Entry, FileMetadata, UploadRequest};

/// Common trait for cloud service integrations.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Returns the display name of this cloud provider (e.g. "Dropbox").
    fn name(&self) -> &str;

    /// Authenticates with the cloud provider.
    async fn authenticate(&self) -> Result<()>;
}

/// The four storage calls the gallery needs.
///
/// `DropboxClient` is the production implementation; tests drive the
/// gallery with in-memory stores.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Flat, non-recursive listing of `path` (`""` is the root).
    async fn list_folder(&self, path: &str) -> Result<Vec<Entry>>;

    /// Short-lived direct download URL for the file at `path`.
    async fn temporary_link(&self, path: &str) -> Result<String>;

    /// Upload `request` into `folder`, auto-renaming on collision.
    async fn upload(&self, folder: &str, request: UploadRequest) -> Result<FileMetadata>;

    /// Delete the file or folder at `path`.
    async fn delete(&self, path: &str) -> Result<Entry>;
}
