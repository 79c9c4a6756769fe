//! Passcode-gated media gallery over a [`MediaStore`].
//!
//! The gallery owns an explicit [`GalleryState`] and a [`NotificationLog`].
//! Every storage failure is recorded as an error notification and returned
//! unchanged; the gallery never wraps it in a new error type.

pub mod media;
pub mod notification;
pub mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::cloud::dropbox::{FileMetadata, UploadRequest};
use crate::cloud::MediaStore;
use crate::config::dynamic::DynamicConfig;
use crate::errors::{FolioError, Result};
use crate::http_client::HttpClient;

pub use media::{classify, format_size, GalleryItem, MediaKind};
pub use notification::{Notification, NotificationLevel, NotificationLog};
pub use state::{GalleryEvent, GalleryState};

/// Knobs read from `DynamicConfig`.
#[derive(Debug, Clone)]
pub struct GallerySettings {
    pub folder: String,
    pub passcode: String,
    pub notification_ttl: chrono::Duration,
}

impl GallerySettings {
    pub fn from_config(config: &DynamicConfig) -> Self {
        Self {
            folder: config.gallery_folder.clone(),
            passcode: config.gallery_passcode.clone(),
            notification_ttl: chrono::Duration::seconds(config.notification_ttl as i64),
        }
    }
}

pub struct Gallery {
    store: Arc<dyn MediaStore>,
    http: HttpClient,
    settings: GallerySettings,
    state: GalleryState,
    items: Vec<GalleryItem>,
    notifications: NotificationLog,
}

impl Gallery {
    pub fn new(store: Arc<dyn MediaStore>, http: HttpClient, settings: GallerySettings) -> Self {
        let notifications = NotificationLog::new(settings.notification_ttl);
        Self {
            store,
            http,
            settings,
            state: GalleryState::Locked,
            items: Vec::new(),
            notifications,
        }
    }

    pub fn state(&self) -> GalleryState {
        self.state
    }

    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub fn photos(&self) -> impl Iterator<Item = &GalleryItem> {
        self.items.iter().filter(|i| i.kind == MediaKind::Photo)
    }

    pub fn videos(&self) -> impl Iterator<Item = &GalleryItem> {
        self.items.iter().filter(|i| i.kind == MediaKind::Video)
    }

    /// Notifications still visible at `now`, oldest first.
    pub fn notifications(&mut self, now: DateTime<Utc>) -> &[Notification] {
        self.notifications.active(now)
    }

    pub fn latest_notification(&self) -> Option<&Notification> {
        self.notifications.latest()
    }

    /// Remove and return every pending notification, expired or not.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    fn apply(&mut self, event: GalleryEvent) -> Result<()> {
        self.state = self.state.transition(event)?;
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.state.is_locked() {
            return Err(FolioError::Locked);
        }
        Ok(())
    }

    /// Unlock with `passcode` and load the gallery.
    ///
    /// A wrong passcode leaves the gallery locked and records an error.
    pub async fn unlock(&mut self, passcode: &str) -> Result<()> {
        if !self.state.is_locked() {
            return Ok(());
        }
        if passcode != self.settings.passcode {
            self.notifications
                .push(NotificationLevel::Error, "Invalid access key");
            return Err(FolioError::InvalidPasscode);
        }

        self.apply(GalleryEvent::Unlock)?;
        tracing::info!("Gallery unlocked");
        self.notifications
            .push(NotificationLevel::Success, "Connected to Dropbox");
        self.refresh().await
    }

    /// Re-list the gallery folder, keeping only photo and video files.
    pub async fn refresh(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        self.apply(GalleryEvent::StartLoading)?;

        let listed = self.store.list_folder(&self.settings.folder).await;
        self.apply(GalleryEvent::FinishLoading)?;

        match listed {
            Ok(entries) => {
                self.items = entries
                    .iter()
                    .filter_map(|e| e.as_file())
                    .filter_map(GalleryItem::from_file)
                    .collect();
                tracing::debug!(count = self.items.len(), "Gallery refreshed");
                Ok(())
            }
            Err(e) => {
                self.notifications
                    .push(NotificationLevel::Error, "Failed to load gallery items");
                Err(e)
            }
        }
    }

    /// Upload a file, then re-list the folder.
    pub async fn upload(&mut self, request: UploadRequest) -> Result<FileMetadata> {
        self.ensure_unlocked()?;
        self.apply(GalleryEvent::StartUpload)?;
        self.notifications.push(
            NotificationLevel::Info,
            format!("Uploading {}...", request.name),
        );

        let uploaded = self.store.upload(&self.settings.folder, request).await;
        self.apply(GalleryEvent::FinishUpload)?;

        let file = match uploaded {
            Ok(file) => file,
            Err(e) => {
                self.notifications
                    .push(NotificationLevel::Error, "Upload failed");
                return Err(e);
            }
        };
        self.notifications
            .push(NotificationLevel::Success, "Upload successful!");

        // A failed refetch is already reported as its own notification.
        let _ = self.refresh().await;
        Ok(file)
    }

    /// Temporary link for viewing the file at `path`.
    pub async fn preview(&mut self, path: &str) -> Result<String> {
        self.ensure_unlocked()?;
        match self.store.temporary_link(path).await {
            Ok(link) => Ok(link),
            Err(e) => {
                self.notifications
                    .push(NotificationLevel::Error, "Failed to generate preview link");
                Err(e)
            }
        }
    }

    /// Download the file at `path` into `dest`, returning the bytes written.
    pub async fn download(&mut self, path: &str, dest: &Path) -> Result<u64> {
        self.download_with_progress(path, dest, |_, _| {}).await
    }

    /// Like [`Gallery::download`], calling `on_progress(written, total)` after each chunk.
    pub async fn download_with_progress(
        &mut self,
        path: &str,
        dest: &Path,
        on_progress: impl FnMut(u64, Option<u64>),
    ) -> Result<u64> {
        self.ensure_unlocked()?;
        let result = match self.store.temporary_link(path).await {
            Ok(link) => self.fetch_to_file(&link, dest, on_progress).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.notifications
                .push(NotificationLevel::Error, "Failed to download file");
        }
        result
    }

    /// Stream `link` into a sibling `.part` file and rename it onto `dest`
    /// once complete. On any failure `dest` is left as it was.
    async fn fetch_to_file(
        &self,
        link: &str,
        dest: &Path,
        on_progress: impl FnMut(u64, Option<u64>),
    ) -> Result<u64> {
        let client = self.http.transfer().await;
        let resp = client.get(link).send().await.map_err(FolioError::Http)?;
        if !resp.status().is_success() {
            return Err(FolioError::from_response("download", resp).await);
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(dest);
        let result = match write_body(resp, &partial, on_progress).await {
            Ok(written) => tokio::fs::rename(&partial, dest)
                .await
                .map(|_| written)
                .map_err(FolioError::from),
            Err(e) => Err(e),
        };
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&partial).await {
                tracing::debug!(path = %partial.display(), error = %e, "No partial download to remove");
            }
        }
        result
    }

    /// Delete the file at `path`, then re-list the folder.
    pub async fn delete(&mut self, path: &str) -> Result<()> {
        self.ensure_unlocked()?;
        if let Err(e) = self.store.delete(path).await {
            self.notifications
                .push(NotificationLevel::Error, "Failed to delete file");
            return Err(e);
        }
        self.notifications
            .push(NotificationLevel::Success, "File deleted");
        let _ = self.refresh().await;
        Ok(())
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_body(
    resp: reqwest::Response,
    path: &Path,
    mut on_progress: impl FnMut(u64, Option<u64>),
) -> Result<u64> {
    let total = resp.content_length();
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FolioError::Http)?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        on_progress(written, total);
    }
    file.flush().await?;
    Ok(written)
}
