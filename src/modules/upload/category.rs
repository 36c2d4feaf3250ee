use std::fmt;

use crate::api::error::UploadError;

pub const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
pub const VIDEO_TYPES: &[&str] =
    &["video/mp4", "video/quicktime", "video/x-msvideo", "video/webm", "video/x-matroska"];
pub const AUDIO_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/ogg"];

/// Client-declared kind of media, selecting the MIME allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadCategory {
    #[default]
    Image,
    Video,
    Audio,
}

impl UploadCategory {
    /// Unset or unrecognized values resolve to `Image`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("video") => UploadCategory::Video,
            Some("audio") => UploadCategory::Audio,
            _ => UploadCategory::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::Image => "image",
            UploadCategory::Video => "video",
            UploadCategory::Audio => "audio",
        }
    }

    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            UploadCategory::Image => IMAGE_TYPES,
            UploadCategory::Video => VIDEO_TYPES,
            UploadCategory::Audio => AUDIO_TYPES,
        }
    }

    /// Accepts `mime_type` when its essence (no parameters, case-insensitive)
    /// is on this category's allow-list.
    pub fn classify(&self, field: &str, mime_type: &str) -> Result<(), UploadError> {
        let essence = mime_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

        if self.allowed_types().contains(&essence.as_str()) {
            return Ok(());
        }

        Err(UploadError::InvalidFileType {
            field: field.to_string(),
            category: *self,
            mime_type: mime_type.to_string(),
            allowed: self.allowed_types(),
        })
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
