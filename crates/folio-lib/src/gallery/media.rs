use serde::Serialize;

use crate::cloud::dropbox::{remote_path, FileMetadata};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Photo => write!(f, "photo"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Classify a filename by its extension, ignoring case.
///
/// Names without a recognised photo or video extension return `None`.
pub fn classify(name: &str) -> Option<MediaKind> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Photo)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// One media file shown in the gallery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryItem {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub kind: MediaKind,
}

impl GalleryItem {
    /// Build an item from file metadata, or `None` when the file is not media.
    pub fn from_file(file: &FileMetadata) -> Option<Self> {
        let kind = classify(&file.name)?;
        let path = file
            .path_display
            .clone()
            .or_else(|| file.path_lower.clone())
            .unwrap_or_else(|| remote_path("", &file.name));
        Some(Self {
            id: file.id.clone(),
            name: file.name.clone(),
            path,
            size: file.size,
            kind,
        })
    }

    pub fn size_display(&self) -> String {
        format_size(self.size)
    }
}

/// Format a byte count as megabytes with two decimals, e.g. `"1.50 MB"`.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}
